//! Top-down call tree built from stack samples.
//!
//! Each sample is a stack of frames (outermost first) plus the line the
//! innermost frame was executing. Samples sharing a call path are merged:
//! a child is reused when its frame identity (name, resource, line, column)
//! matches, so `f` calling `g` twice produces a single `g` node under `f`.
//!
//! Example: samples `[main, f, g]@12`, `[main, f, g]@13`, `[main, f]@4`
//! give `(root) -> main -> f (1 hit) -> g (2 hits, ticks 12:1, 13:1)`.

use super::{LineTick, RawNodeId, RawProfile};
use crate::utils::config::{MAX_TIMELINE_SAMPLES, NO_POSITION, ROOT_NODE_NAME};
use log::{debug, trace};
use std::collections::HashMap;
use std::time::Duration;

/// Identity of a function as seen by the sampler
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    pub function_name: String,
    pub resource_name: String,
    pub line: i32,
    pub column: i32,
}

impl Frame {
    pub fn new(
        function_name: impl Into<String>,
        resource_name: impl Into<String>,
        line: i32,
        column: i32,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            resource_name: resource_name.into(),
            line,
            column,
        }
    }

    /// Frame without any source position (native or anonymous code)
    pub fn unknown(function_name: impl Into<String>) -> Self {
        Self::new(function_name, "", NO_POSITION, NO_POSITION)
    }
}

#[derive(Debug, Clone)]
struct TreeNode {
    frame: Frame,
    hit_count: u32,
    children: Vec<RawNodeId>,
    line_ticks: Vec<LineTick>,
}

impl TreeNode {
    fn new(frame: Frame) -> Self {
        Self {
            frame,
            hit_count: 0,
            children: Vec::new(),
            line_ticks: Vec::new(),
        }
    }

    fn add_line_tick(&mut self, line: i32) {
        match self.line_ticks.iter_mut().find(|tick| tick.line == line) {
            Some(tick) => tick.hit_count += 1,
            None => self.line_ticks.push(LineTick::new(line, 1)),
        }
    }
}

/// Accumulates samples into a call tree while a session is running
#[derive(Debug, Clone)]
pub struct CallTreeBuilder {
    nodes: Vec<TreeNode>,
    index: HashMap<(RawNodeId, Frame), RawNodeId>,
    timeline: Option<Vec<(RawNodeId, Duration)>>,
    timeline_limit: usize,
    dropped_samples: usize,
}

impl CallTreeBuilder {
    /// Create a builder holding only the root node.
    ///
    /// With `record_samples` set, every sample is also appended to a
    /// timeline of (leaf node, elapsed) entries, up to `MAX_TIMELINE_SAMPLES`.
    pub fn new(record_samples: bool) -> Self {
        let limit = if record_samples { MAX_TIMELINE_SAMPLES } else { 0 };
        Self::with_timeline_limit(record_samples, limit)
    }

    /// Like `new`, but keep at most `limit` timeline entries
    pub fn with_timeline_limit(record_samples: bool, limit: usize) -> Self {
        Self {
            nodes: vec![TreeNode::new(Frame::unknown(ROOT_NODE_NAME))],
            index: HashMap::new(),
            timeline: record_samples.then(Vec::new),
            timeline_limit: limit,
            dropped_samples: 0,
        }
    }

    /// Merge one sample into the tree and return the node it was attributed to.
    ///
    /// `stack` is ordered outermost first. `current_line` is the line the
    /// innermost frame was executing, `None` when unknown; such a sample
    /// still counts as a hit but leaves the line table untouched.
    pub fn add_sample(
        &mut self,
        stack: &[Frame],
        current_line: Option<i32>,
        elapsed: Duration,
    ) -> RawNodeId {
        let mut node = RawNodeId(0);
        for frame in stack {
            node = self.child_for(node, frame);
        }

        let leaf = &mut self.nodes[node.0];
        leaf.hit_count += 1;
        if let Some(line) = current_line {
            leaf.add_line_tick(line);
        }

        if let Some(timeline) = self.timeline.as_mut() {
            if timeline.len() < self.timeline_limit {
                timeline.push((node, elapsed));
            } else {
                if self.dropped_samples == 0 {
                    debug!("Sample timeline full ({} entries). Dropping samples.", timeline.len());
                }
                self.dropped_samples += 1;
            }
        }

        trace!("Sample of depth {} attributed to node {}", stack.len(), node.0);
        node
    }

    fn child_for(&mut self, parent: RawNodeId, frame: &Frame) -> RawNodeId {
        let key = (parent, frame.clone());
        if let Some(existing) = self.index.get(&key) {
            return *existing;
        }

        let id = RawNodeId(self.nodes.len());
        self.nodes.push(TreeNode::new(frame.clone()));
        self.nodes[parent.0].children.push(id);
        self.index.insert(key, id);
        id
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Samples left out of the timeline because it was full
    pub fn dropped_samples(&self) -> usize {
        self.dropped_samples
    }

    /// Freeze the tree
    pub fn finish(self) -> CallTree {
        debug!(
            "Finished call tree with {} nodes and {} recorded samples ({} dropped)",
            self.nodes.len(),
            self.timeline.as_ref().map_or(0, Vec::len),
            self.dropped_samples
        );
        CallTree {
            nodes: self.nodes,
            timeline: self.timeline.unwrap_or_default(),
        }
    }
}

/// Immutable call tree produced by `CallTreeBuilder::finish`
#[derive(Debug, Clone)]
pub struct CallTree {
    nodes: Vec<TreeNode>,
    timeline: Vec<(RawNodeId, Duration)>,
}

impl CallTree {
    fn node(&self, id: RawNodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl RawProfile for CallTree {
    fn root(&self) -> RawNodeId {
        RawNodeId(0)
    }

    fn function_name(&self, node: RawNodeId) -> &str {
        self.node(node).map_or("", |n| n.frame.function_name.as_str())
    }

    fn resource_name(&self, node: RawNodeId) -> &str {
        self.node(node).map_or("", |n| n.frame.resource_name.as_str())
    }

    fn line(&self, node: RawNodeId) -> i32 {
        self.node(node).map_or(NO_POSITION, |n| n.frame.line)
    }

    fn column(&self, node: RawNodeId) -> i32 {
        self.node(node).map_or(NO_POSITION, |n| n.frame.column)
    }

    fn child_count(&self, node: RawNodeId) -> usize {
        self.node(node).map_or(0, |n| n.children.len())
    }

    fn child(&self, node: RawNodeId, index: usize) -> Option<RawNodeId> {
        self.node(node)?.children.get(index).copied()
    }

    fn hit_count(&self, node: RawNodeId) -> u32 {
        self.node(node).map_or(0, |n| n.hit_count)
    }

    fn hit_line_count(&self, node: RawNodeId) -> usize {
        self.node(node).map_or(0, |n| n.line_ticks.len())
    }

    fn line_ticks(&self, node: RawNodeId, buffer: &mut [LineTick]) -> usize {
        let Some(node) = self.node(node) else {
            return 0;
        };
        let written = node.line_ticks.len().min(buffer.len());
        buffer[..written].copy_from_slice(&node.line_ticks[..written]);
        written
    }

    fn sample_count(&self) -> usize {
        self.timeline.len()
    }

    fn sample(&self, index: usize) -> Option<(RawNodeId, Duration)> {
        self.timeline.get(index).copied()
    }

    fn release(self: Box<Self>) {
        debug!("Releasing call tree with {} nodes", self.nodes.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str, line: i32) -> Frame {
        Frame::new(name, "app.js", line, 1)
    }

    #[test]
    fn test_samples_merge_by_call_path() {
        let mut builder = CallTreeBuilder::new(false);
        let f = frame("f", 1);
        let g = frame("g", 10);

        builder.add_sample(&[f.clone(), g.clone()], Some(11), Duration::ZERO);
        builder.add_sample(&[f.clone(), g.clone()], Some(12), Duration::ZERO);
        builder.add_sample(&[f.clone()], Some(3), Duration::ZERO);

        let tree = builder.finish();
        // root, f, g
        assert_eq!(tree.node_count(), 3);

        let root = tree.root();
        assert_eq!(tree.function_name(root), ROOT_NODE_NAME);
        assert_eq!(tree.child_count(root), 1);

        let f_id = tree.child(root, 0).unwrap();
        assert_eq!(tree.function_name(f_id), "f");
        assert_eq!(tree.hit_count(f_id), 1);

        let g_id = tree.child(f_id, 0).unwrap();
        assert_eq!(tree.hit_count(g_id), 2);
        assert_eq!(tree.hit_line_count(g_id), 2);
    }

    #[test]
    fn test_same_function_on_distinct_paths_is_duplicated() {
        let mut builder = CallTreeBuilder::new(false);
        let a = frame("a", 1);
        let b = frame("b", 5);
        let shared = frame("shared", 20);

        builder.add_sample(&[a, shared.clone()], None, Duration::ZERO);
        builder.add_sample(&[b, shared], None, Duration::ZERO);

        let tree = builder.finish();
        // root, a, shared, b, shared
        assert_eq!(tree.node_count(), 5);
    }

    #[test]
    fn test_line_ticks_keep_first_seen_order() {
        let mut builder = CallTreeBuilder::new(false);
        let g = frame("g", 10);
        for line in [14, 11, 14, 12] {
            builder.add_sample(std::slice::from_ref(&g), Some(line), Duration::ZERO);
        }

        let tree = builder.finish();
        let g_id = tree.child(tree.root(), 0).unwrap();
        let mut buffer = vec![LineTick::default(); tree.hit_line_count(g_id)];
        let written = tree.line_ticks(g_id, &mut buffer);

        assert_eq!(written, 3);
        assert_eq!(
            buffer,
            vec![LineTick::new(14, 2), LineTick::new(11, 1), LineTick::new(12, 1)]
        );
    }

    #[test]
    fn test_unknown_line_counts_hit_without_tick() {
        let mut builder = CallTreeBuilder::new(false);
        let g = frame("g", 10);
        builder.add_sample(std::slice::from_ref(&g), None, Duration::ZERO);
        builder.add_sample(std::slice::from_ref(&g), Some(10), Duration::ZERO);

        let tree = builder.finish();
        let g_id = tree.child(tree.root(), 0).unwrap();
        assert_eq!(tree.hit_count(g_id), 2);
        assert_eq!(tree.hit_line_count(g_id), 1);
    }

    #[test]
    fn test_empty_stack_hits_root() {
        let mut builder = CallTreeBuilder::new(true);
        builder.add_sample(&[], None, Duration::from_micros(5));

        let tree = builder.finish();
        assert_eq!(tree.hit_count(tree.root()), 1);
        assert_eq!(tree.sample_count(), 1);
        assert_eq!(tree.sample(0), Some((RawNodeId(0), Duration::from_micros(5))));
    }

    #[test]
    fn test_timeline_is_capped() {
        let mut builder = CallTreeBuilder::with_timeline_limit(true, 2);
        let g = frame("g", 10);
        for _ in 0..5 {
            builder.add_sample(std::slice::from_ref(&g), Some(11), Duration::ZERO);
        }
        assert_eq!(builder.dropped_samples(), 3);

        let tree = builder.finish();
        let g_id = tree.child(tree.root(), 0).unwrap();
        assert_eq!(tree.sample_count(), 2);
        assert_eq!(tree.hit_count(g_id), 5);
    }

    #[test]
    fn test_out_of_range_ids() {
        let tree = CallTreeBuilder::new(false).finish();
        let bogus = RawNodeId(42);
        assert_eq!(tree.function_name(bogus), "");
        assert_eq!(tree.line(bogus), NO_POSITION);
        assert_eq!(tree.child(bogus, 0), None);
        assert_eq!(tree.line_ticks(bogus, &mut []), 0);
    }
}
