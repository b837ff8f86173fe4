//! Report JSON schema definitions.
//!
//! This module defines the structure of report files we write to disk.
//! Schema is versioned to allow future evolution.

use crate::engine::LineTick;
use serde::{Deserialize, Serialize};

/// Top-level report written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    /// Schema version for compatibility checking
    pub version: String,

    /// Label of the profiling session
    pub label: String,

    /// Sampling interval the session ran with
    pub sampling_interval_us: u32,

    /// Sum of self hits over the whole tree
    pub total_hits: u64,

    /// Top hot paths (ranked by hits)
    pub hot_paths: Vec<HotPath>,

    /// The walked call tree
    pub root: NodeReport,

    /// Timestamp when the report was generated
    pub generated_at: String,
}

/// Owned copy of one call tree node and its subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReport {
    pub name: String,
    pub resource_name: String,
    pub line: i32,
    pub column: i32,
    pub hits: u32,
    pub hit_lines: Vec<LineTick>,
    pub children: Vec<NodeReport>,
}

impl NodeReport {
    /// Pre-order iterator over this node and its descendants, paired with
    /// their depth (this node is depth 1)
    pub fn iter(&self) -> impl Iterator<Item = (usize, &NodeReport)> + '_ {
        let mut pending = vec![(1, self)];
        std::iter::from_fn(move || {
            let (depth, node) = pending.pop()?;
            pending.extend(node.children.iter().rev().map(|child| (depth + 1, child)));
            Some((depth, node))
        })
    }

    /// Self hits of this node plus all descendants
    pub fn total_hits(&self) -> u64 {
        self.iter().map(|(_, node)| u64::from(node.hits)).sum()
    }

    /// Number of nodes in this subtree, including itself
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    pub fn depth(&self) -> usize {
        self.iter().map(|(depth, _)| depth).max().unwrap_or(1)
    }
}

impl Drop for NodeReport {
    // Flatten before dropping so deep trees do not recurse
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// A hot path in the call tree (stack with self hits)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotPath {
    /// Collapsed stack representation (e.g., "main;f;g")
    pub stack: String,

    /// Self hits of the innermost frame on this path
    pub hits: u64,

    /// Percentage of total hits
    pub percentage: f64,
}
