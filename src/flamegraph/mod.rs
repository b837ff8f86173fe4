//! Flamegraph generation.
//!
//! This module converts collapsed stacks into SVG flamegraphs and
//! plain-text summaries of where samples landed.

pub mod generator;

// Re-export main types
pub use generator::{generate_flamegraph, generate_text_summary, FlamegraphConfig};
