use crate::flamegraph::FlamegraphConfig;
use crate::utils::config::{
    DEFAULT_CONTROL_HOST, DEFAULT_CONTROL_PORT, DEFAULT_LABEL, DEFAULT_SAMPLING_INTERVAL_US,
};
use std::path::PathBuf;

/// Arguments for the record command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct RecordArgs {
    /// Session label used for start/stop
    pub label: String,

    /// Sampling interval in microseconds
    pub interval_us: i64,

    /// Number of workload iterations (`f` calls)
    pub iterations: u32,

    /// Loop rounds inside each `g` call
    pub rounds: u64,

    /// Output path for JSON report
    pub output_json: PathBuf,

    /// Output path for SVG flamegraph (optional)
    pub output_svg: Option<PathBuf>,

    /// Number of top hot paths to include in the report
    pub top_paths: usize,

    /// Flamegraph configuration
    pub flamegraph_config: Option<FlamegraphConfig>,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for RecordArgs {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            interval_us: i64::from(DEFAULT_SAMPLING_INTERVAL_US),
            iterations: 200,
            rounds: 20_000,
            output_json: PathBuf::from("profile.json"),
            output_svg: None,
            top_paths: 20,
            flamegraph_config: None,
            print_summary: false,
        }
    }
}

/// Arguments for the serve command
#[derive(Debug, Clone)]
pub struct ServeArgs {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Session label driven by `/start` and `/stop`
    pub label: String,

    /// Sampling interval in microseconds
    pub interval_us: i64,

    /// Keep the built-in workload running so sessions have something to sample
    pub workload: bool,

    /// Loop rounds inside each `g` call of the background workload
    pub rounds: u64,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            host: DEFAULT_CONTROL_HOST.to_string(),
            port: DEFAULT_CONTROL_PORT,
            label: DEFAULT_LABEL.to_string(),
            interval_us: i64::from(DEFAULT_SAMPLING_INTERVAL_US),
            workload: false,
            rounds: 20_000,
        }
    }
}
