//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors raised by the profiler, its snapshots and their node views
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfilerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Sampling engine is not available")]
    EngineUnavailable,

    #[error("No active profiling session for label '{0}'")]
    NoActiveSession(String),

    #[error("Label mismatch: stop('{requested}') but active sessions are {active:?}")]
    LabelMismatch {
        requested: String,
        active: Vec<String>,
    },

    #[error("Profiling session '{0}' is already running")]
    SessionAlreadyActive(String),

    #[error("Profile snapshot has already been released")]
    UseAfterRelease,

    #[error("Profile snapshot released twice")]
    DoubleRelease,

    #[error("Profile snapshot is being read and cannot be released")]
    SnapshotBusy,

    #[error("Sampling engine failure: {0}")]
    Engine(#[from] EngineError),
}

/// Errors reported by a sampling engine implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Unknown profiling session: {0}")]
    UnknownSession(String),

    #[error("Profiling session already started: {0}")]
    DuplicateSession(String),

    #[error("Sampler thread failed: {0}")]
    SamplerThread(String),
}

/// Errors that can occur during flamegraph generation
#[derive(Error, Debug)]
pub enum FlamegraphError {
    #[error("Empty stack data")]
    EmptyStacks,
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Errors raised by the HTTP control server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind control server: {0}")]
    Bind(String),

    #[error("Control server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Control server thread panicked")]
    Panicked,
}
