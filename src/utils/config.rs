//! Configuration and constants for the profiler and the CLI.

use serde::{Deserialize, Serialize};

/// Default sampling interval in microseconds
pub const DEFAULT_SAMPLING_INTERVAL_US: u32 = 1_000;

/// Floor on the sampler thread's period; shorter intervals are raised to it
pub const MIN_SAMPLER_PERIOD_US: u64 = 50;

/// Most entries a session keeps in its sample timeline
pub const MAX_TIMELINE_SAMPLES: usize = 1_000_000;

/// Label used for sessions when the caller does not pick one
pub const DEFAULT_LABEL: &str = "heatline";

/// Port the control server listens on by default
pub const DEFAULT_CONTROL_PORT: u16 = 11337;

/// Interface the control server binds by default
pub const DEFAULT_CONTROL_HOST: &str = "127.0.0.1";

/// Current report schema version
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Line/column value reported when the engine has no source position
pub const NO_POSITION: i32 = -1;

/// Function name given to the synthetic root of every call tree
pub const ROOT_NODE_NAME: &str = "(root)";

/// Options accepted when constructing a `Profiler`.
///
/// Only the sampling interval can be configured; anything else is left to
/// the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilerOptions {
    /// Sampling interval in microseconds (engine default when absent)
    #[serde(default)]
    pub sampling_interval: Option<i64>,
}

impl ProfilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sampling_interval(mut self, micros: i64) -> Self {
        self.sampling_interval = Some(micros);
        self
    }
}
