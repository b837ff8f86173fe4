//! heatline
//!
//! A sampling CPU profiler front-end: it drives a sampling engine through
//! labelled sessions and exposes each finished capture as a call-tree
//! snapshot with per-node hit counts and per-line hit ticks.
//!
//! ## Getting Started
//!
//! ```ignore
//! use heatline::engine::{Frame, ShadowStackEngine, StackRecorder};
//! use heatline::profiler::Profiler;
//!
//! let recorder = StackRecorder::new();
//! let mut profiler = Profiler::new(ShadowStackEngine::new(recorder.clone()));
//! profiler.set_sampling_interval(1000)?;
//!
//! profiler.start("heatline")?;
//! {
//!     let _frame = recorder.enter(Frame::new("work", "app.rs", 1, 1));
//!     // ...
//! }
//! let snapshot = profiler.stop("heatline")?;
//!
//! for child in snapshot.top()?.children()? {
//!     println!("{} {}", child.name()?, child.hit_count()?);
//! }
//! ```
//!
//! The CLI (`heatline record`) profiles a built-in workload and writes a
//! JSON report and an optional SVG flamegraph. `heatline serve` exposes the
//! same profiler over HTTP (`GET /info`, `POST /start`, `POST /stop`).

pub mod commands;
pub mod engine;
pub mod flamegraph;
pub mod profiler;
pub mod report;
pub mod server;
pub mod utils;

pub use engine::{LineTick, RawNodeId};
pub use profiler::{ProfileNode, ProfileSnapshot, Profiler};
pub use utils::error::ProfilerError;
