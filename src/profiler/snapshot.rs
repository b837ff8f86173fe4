//! Ownership of one captured call tree.
//!
//! A `ProfileSnapshot` is the arena every `ProfileNode` points into. The raw
//! profile lives behind a shared `RwLock<Option<_>>`: node reads take the read
//! side, release takes the write side and leaves `None` behind, so any later
//! read reports `UseAfterRelease` instead of touching freed engine data.

use super::node::ProfileNode;
use crate::engine::{RawNodeId, RawProfile};
use crate::utils::error::ProfilerError;
use log::{debug, warn};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, TryLockError};
use std::time::Duration;

/// State shared between a snapshot and all node views derived from it
pub(crate) struct SnapshotState {
    label: String,
    raw: RwLock<Option<Box<dyn RawProfile>>>,
}

impl SnapshotState {
    /// Run `read` against the raw profile, or fail if it was released
    pub(crate) fn read<T>(
        &self,
        read: impl FnOnce(&dyn RawProfile) -> T,
    ) -> Result<T, ProfilerError> {
        let guard = self.raw.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_deref() {
            Some(raw) => Ok(read(raw)),
            None => Err(ProfilerError::UseAfterRelease),
        }
    }
}

/// One entry of a recorded sample timeline
#[derive(Debug, Clone)]
pub struct ProfileSample {
    /// Node the sample was attributed to
    pub node: ProfileNode,

    /// Time since the session started
    pub elapsed: Duration,
}

/// A completed capture, exclusively owned by whoever called `Profiler::stop`
pub struct ProfileSnapshot {
    state: Arc<SnapshotState>,
}

impl ProfileSnapshot {
    /// Wrap a raw profile handed over by the engine for session `label`
    pub fn new(label: impl Into<String>, raw: Box<dyn RawProfile>) -> Self {
        Self {
            state: Arc::new(SnapshotState {
                label: label.into(),
                raw: RwLock::new(Some(raw)),
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.state.label
    }

    /// View of the root node.
    ///
    /// Repeated calls return equal views over the same tree.
    pub fn top(&self) -> Result<ProfileNode, ProfilerError> {
        let root = self.state.read(|raw| raw.root())?;
        Ok(self.node(root))
    }

    fn node(&self, id: RawNodeId) -> ProfileNode {
        ProfileNode::new(Arc::clone(&self.state), id)
    }

    pub fn is_released(&self) -> bool {
        self.state
            .raw
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Number of samples in the recorded timeline
    pub fn sample_count(&self) -> Result<usize, ProfilerError> {
        self.state.read(|raw| raw.sample_count())
    }

    /// The recorded sample timeline, oldest first
    pub fn samples(&self) -> Result<Vec<ProfileSample>, ProfilerError> {
        let entries = self.state.read(|raw| {
            (0..raw.sample_count())
                .filter_map(|index| raw.sample(index))
                .collect::<Vec<_>>()
        })?;

        Ok(entries
            .into_iter()
            .map(|(id, elapsed)| ProfileSample {
                node: self.node(id),
                elapsed,
            })
            .collect())
    }

    /// Give the captured tree back to the engine.
    ///
    /// # Errors
    /// * `ProfilerError::DoubleRelease` - already released
    /// * `ProfilerError::SnapshotBusy` - a node read is in progress on another thread
    pub fn release(&self) -> Result<(), ProfilerError> {
        let mut guard = match self.state.raw.try_write() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(ProfilerError::SnapshotBusy),
        };

        let Some(raw) = guard.take() else {
            warn!("Snapshot '{}' released twice", self.state.label);
            return Err(ProfilerError::DoubleRelease);
        };
        drop(guard);

        debug!("Releasing snapshot '{}'", self.state.label);
        raw.release();
        Ok(())
    }
}

impl Drop for ProfileSnapshot {
    fn drop(&mut self) {
        let raw = self
            .state
            .raw
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(raw) = raw {
            debug!("Releasing snapshot '{}' on drop", self.state.label);
            raw.release();
        }
    }
}

impl fmt::Debug for ProfileSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileSnapshot")
            .field("label", &self.state.label)
            .field("released", &self.is_released())
            .finish()
    }
}

pub(crate) fn same_snapshot(a: &Arc<SnapshotState>, b: &Arc<SnapshotState>) -> bool {
    Arc::ptr_eq(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CallTreeBuilder, Frame};

    fn snapshot() -> ProfileSnapshot {
        let mut builder = CallTreeBuilder::new(true);
        let f = Frame::new("f", "app.js", 1, 1);
        builder.add_sample(std::slice::from_ref(&f), Some(2), Duration::from_micros(10));
        builder.add_sample(&[], None, Duration::from_micros(20));
        ProfileSnapshot::new("test", Box::new(builder.finish()))
    }

    #[test]
    fn test_top_is_idempotent() {
        let snapshot = snapshot();
        assert_eq!(snapshot.top().unwrap(), snapshot.top().unwrap());
        assert_eq!(snapshot.label(), "test");
    }

    #[test]
    fn test_release_lifecycle() {
        let snapshot = snapshot();
        let top = snapshot.top().unwrap();

        snapshot.release().unwrap();
        assert!(snapshot.is_released());
        assert_eq!(snapshot.top(), Err(ProfilerError::UseAfterRelease));
        assert_eq!(top.name(), Err(ProfilerError::UseAfterRelease));
        assert_eq!(snapshot.release(), Err(ProfilerError::DoubleRelease));
    }

    #[test]
    fn test_release_while_reading_is_busy() {
        let snapshot = snapshot();
        let reader = snapshot.state.raw.read().unwrap();

        assert_eq!(snapshot.release(), Err(ProfilerError::SnapshotBusy));
        drop(reader);

        snapshot.release().unwrap();
    }

    #[test]
    fn test_drop_invalidates_views() {
        let top = {
            let snapshot = snapshot();
            snapshot.top().unwrap()
        };
        assert_eq!(top.hit_count(), Err(ProfilerError::UseAfterRelease));
        assert_eq!(top.children().map(|c| c.len()), Err(ProfilerError::UseAfterRelease));
    }

    #[test]
    fn test_sample_timeline() {
        let snapshot = snapshot();
        assert_eq!(snapshot.sample_count().unwrap(), 2);

        let samples = snapshot.samples().unwrap();
        assert_eq!(samples[0].node.name().unwrap(), "f");
        assert_eq!(samples[0].elapsed, Duration::from_micros(10));
        assert_eq!(samples[1].node, snapshot.top().unwrap());
    }
}
