//! Read-only views over call tree vertices.

use super::snapshot::{same_snapshot, SnapshotState};
use crate::engine::{LineTick, RawNodeId};
use crate::utils::error::ProfilerError;
use std::fmt;
use std::sync::Arc;

/// A view of one node of a snapshot's call tree.
///
/// Views are cheap handles `(snapshot, node id)`; every accessor reads
/// through the owning snapshot and fails with
/// `ProfilerError::UseAfterRelease` once that snapshot has been released.
#[derive(Clone)]
pub struct ProfileNode {
    snapshot: Arc<SnapshotState>,
    id: RawNodeId,
}

impl ProfileNode {
    pub(crate) fn new(snapshot: Arc<SnapshotState>, id: RawNodeId) -> Self {
        Self { snapshot, id }
    }

    pub fn id(&self) -> RawNodeId {
        self.id
    }

    /// Function name; empty for anonymous or native frames
    pub fn name(&self) -> Result<String, ProfilerError> {
        self.snapshot
            .read(|raw| raw.function_name(self.id).to_string())
    }

    /// Script or other resource the function belongs to
    pub fn resource_name(&self) -> Result<String, ProfilerError> {
        self.snapshot
            .read(|raw| raw.resource_name(self.id).to_string())
    }

    /// 1-based line of the function, `NO_POSITION` if unknown
    pub fn line(&self) -> Result<i32, ProfilerError> {
        self.snapshot.read(|raw| raw.line(self.id))
    }

    /// 1-based column of the function, `NO_POSITION` if unknown
    pub fn column(&self) -> Result<i32, ProfilerError> {
        self.snapshot.read(|raw| raw.column(self.id))
    }

    /// Samples whose innermost frame was this node
    pub fn hit_count(&self) -> Result<u32, ProfilerError> {
        self.snapshot.read(|raw| raw.hit_count(self.id))
    }

    pub fn child_count(&self) -> Result<usize, ProfilerError> {
        self.snapshot.read(|raw| raw.child_count(self.id))
    }

    /// Views of the children in the order the engine recorded them
    pub fn children(&self) -> Result<Vec<ProfileNode>, ProfilerError> {
        let ids = self.snapshot.read(|raw| {
            (0..raw.child_count(self.id))
                .filter_map(|index| raw.child(self.id, index))
                .collect::<Vec<_>>()
        })?;

        Ok(ids
            .into_iter()
            .map(|id| ProfileNode::new(Arc::clone(&self.snapshot), id))
            .collect())
    }

    /// Per-line sample counts within this node's function.
    ///
    /// Entries come in the engine's line-table order, not sorted by line.
    /// Their sum is not expected to match `hit_count()`: line ticks are
    /// only recorded for samples that carried a source line.
    pub fn hit_lines(&self) -> Result<Vec<LineTick>, ProfilerError> {
        self.snapshot.read(|raw| {
            let mut ticks = vec![LineTick::default(); raw.hit_line_count(self.id)];
            let written = raw.line_ticks(self.id, &mut ticks);
            ticks.truncate(written);
            ticks.retain(|tick| tick.hit_count > 0);
            ticks
        })
    }
}

impl PartialEq for ProfileNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && same_snapshot(&self.snapshot, &other.snapshot)
    }
}

impl Eq for ProfileNode {}

impl fmt::Debug for ProfileNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileNode").field("id", &self.id.0).finish()
    }
}
