//! HTTP control server.
//!
//! Lets another process start a profiling session and collect its call tree
//! as JSON, without linking against the library.

pub mod http;
pub mod routes;

pub use http::{ControlServer, ServerHandle};
pub use routes::{ControlBody, ControlResponse, ControlState};
