//! Owned reports built from live snapshots.
//!
//! This module handles:
//! - Walking a snapshot into a serializable tree
//! - Collapsed stacks and hot path metrics
//! - Writing and reading JSON report files
//! - Writing SVG flamegraphs

pub mod collapsed;
pub mod json;
pub mod schema;
pub mod svg;
pub mod walk;

// Re-export main types and functions
pub use collapsed::{build_collapsed_stacks, calculate_hot_paths, CollapsedStack};
pub use json::{read_report, report_to_string, write_report};
pub use schema::{HotPath, NodeReport, ProfileReport};
pub use svg::write_svg;
pub use walk::{build_report, walk};
