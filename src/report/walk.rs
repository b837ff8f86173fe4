//! Walk a live snapshot into an owned report tree.

use super::collapsed::{build_collapsed_stacks, calculate_hot_paths};
use super::schema::{NodeReport, ProfileReport};
use crate::profiler::{ProfileNode, ProfileSnapshot};
use crate::utils::config::REPORT_SCHEMA_VERSION;
use crate::utils::error::ProfilerError;
use log::debug;

/// A node whose fields have been read but whose children are still being walked
struct PendingNode {
    report: NodeReport,
    children: std::vec::IntoIter<ProfileNode>,
}

impl PendingNode {
    fn read(node: &ProfileNode) -> Result<Self, ProfilerError> {
        let children = node.children()?;
        Ok(Self {
            report: NodeReport {
                name: node.name()?,
                resource_name: node.resource_name()?,
                line: node.line()?,
                column: node.column()?,
                hits: node.hit_count()?,
                hit_lines: node.hit_lines()?,
                children: Vec::with_capacity(children.len()),
            },
            children: children.into_iter(),
        })
    }
}

/// Copy `node` and everything below it out of its snapshot.
///
/// The tree is walked with an explicit stack, so call depth is bounded by
/// memory rather than by the thread's stack size.
pub fn walk(node: &ProfileNode) -> Result<NodeReport, ProfilerError> {
    let mut ancestors: Vec<PendingNode> = Vec::new();
    let mut current = PendingNode::read(node)?;

    loop {
        if let Some(child) = current.children.next() {
            let child = PendingNode::read(&child)?;
            ancestors.push(std::mem::replace(&mut current, child));
            continue;
        }

        match ancestors.pop() {
            Some(mut parent) => {
                parent.report.children.push(current.report);
                current = parent;
            }
            None => return Ok(current.report),
        }
    }
}

/// Build a full report for `snapshot`
///
/// # Arguments
/// * `snapshot` - Live (unreleased) snapshot
/// * `sampling_interval_us` - Interval the session ran with
/// * `top_paths` - Number of hot paths to include
///
/// # Errors
/// * `ProfilerError::UseAfterRelease` - snapshot already released
pub fn build_report(
    snapshot: &ProfileSnapshot,
    sampling_interval_us: u32,
    top_paths: usize,
) -> Result<ProfileReport, ProfilerError> {
    let root = walk(&snapshot.top()?)?;
    let total_hits = root.total_hits();

    debug!(
        "Walked snapshot '{}': {} nodes, depth {}, {} hits",
        snapshot.label(),
        root.node_count(),
        root.depth(),
        total_hits
    );

    let stacks = build_collapsed_stacks(&root);
    let hot_paths = calculate_hot_paths(&stacks, total_hits, top_paths);

    Ok(ProfileReport {
        version: REPORT_SCHEMA_VERSION.to_string(),
        label: snapshot.label().to_string(),
        sampling_interval_us,
        total_hits,
        hot_paths,
        root,
        generated_at: chrono::Utc::now().to_rfc3339(),
    })
}
