//! CLI command implementations.
//!
//! Commands orchestrate the various library components to perform user tasks.

pub mod models;
pub mod record;
pub mod serve;
pub mod utils;
pub mod workload;

// Re-export main command functions
pub use models::{RecordArgs, ServeArgs};
pub use record::{execute_record, validate_args};
pub use serve::{execute_serve, validate_serve_args};
pub use utils::{display_schema, display_version, validate_report_file};
pub use workload::run_workload;
