//! Sampling engine contract and the bundled in-process engine.
//!
//! This module defines what the profiler consumes from a sampling engine:
//! - `SamplingEngine` drives sessions (interval, start, stop)
//! - `RawProfile` exposes the captured tree through arena indices
//!
//! `ShadowStackEngine` is a complete engine that samples an explicitly
//! instrumented shadow stack from a timer thread.

pub mod call_tree;
pub mod shadow_stack;

use crate::utils::error::EngineError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// Re-export main types
pub use call_tree::{CallTree, CallTreeBuilder, Frame};
pub use shadow_stack::{FrameGuard, SampleTrigger, ShadowStackEngine, StackRecorder};

/// Index of a node inside a raw profile's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawNodeId(pub usize);

/// Samples attributed to one source line of a node's function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineTick {
    pub line: i32,
    pub hit_count: u32,
}

impl LineTick {
    pub fn new(line: i32, hit_count: u32) -> Self {
        Self { line, hit_count }
    }
}

/// A finished capture as handed over by the engine.
///
/// Node ids are only meaningful for the profile that produced them. Accessors
/// given an id outside the arena return empty/zero values.
pub trait RawProfile: Send + Sync {
    fn root(&self) -> RawNodeId;

    fn function_name(&self, node: RawNodeId) -> &str;
    fn resource_name(&self, node: RawNodeId) -> &str;
    fn line(&self, node: RawNodeId) -> i32;
    fn column(&self, node: RawNodeId) -> i32;

    fn child_count(&self, node: RawNodeId) -> usize;
    fn child(&self, node: RawNodeId, index: usize) -> Option<RawNodeId>;

    fn hit_count(&self, node: RawNodeId) -> u32;

    /// Number of distinct sampled lines recorded for `node`
    fn hit_line_count(&self, node: RawNodeId) -> usize;

    /// Fill `buffer` with the line table of `node` and return how many
    /// entries were written.
    fn line_ticks(&self, node: RawNodeId, buffer: &mut [LineTick]) -> usize;

    /// Number of entries in the sample timeline (zero unless recorded)
    fn sample_count(&self) -> usize;

    /// Leaf node and elapsed time since session start of the `index`-th sample
    fn sample(&self, index: usize) -> Option<(RawNodeId, Duration)>;

    /// Hand the captured data back to the engine
    fn release(self: Box<Self>);
}

/// Session control surface of a sampling engine
pub trait SamplingEngine: Send {
    fn set_interval(&mut self, micros: u32);

    fn start_profiling(&mut self, label: &str, record_samples: bool) -> Result<(), EngineError>;

    fn stop_profiling(&mut self, label: &str) -> Result<Box<dyn RawProfile>, EngineError>;
}
