//! Request routing for the control server.
//!
//! Routes:
//! - `GET /info` - `{ "running": bool }`
//! - `POST /start` - `{ "ok": true }`, 400 if a session is already running
//! - `POST /stop` - the walked call tree, 400 if nothing is running
//!
//! Any other method gets a 400, any other POST path a 404.

use crate::profiler::Profiler;
use crate::report::{walk, NodeReport};
use crate::utils::error::ProfilerError;
use log::{debug, info, warn};
use serde::Serialize;
use tiny_http::Method;

/// JSON body of a control response
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ControlBody {
    Info { running: bool },
    Started { ok: bool },
    Error { error: String },
    Profile(NodeReport),
}

#[derive(Debug)]
pub struct ControlResponse {
    pub status: u16,
    pub body: ControlBody,
}

impl ControlResponse {
    fn ok(body: ControlBody) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ControlBody::Error {
                error: message.into(),
            },
        }
    }
}

/// A profiler and the one session label the control routes drive
pub struct ControlState {
    profiler: Profiler,
    label: String,
}

impl ControlState {
    pub fn new(profiler: Profiler, label: impl Into<String>) -> Self {
        Self {
            profiler,
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_running(&self) -> bool {
        self.profiler
            .active_labels()
            .iter()
            .any(|active| *active == self.label)
    }

    /// Route one request. `url` may carry a query string, which is ignored.
    pub fn handle(&mut self, method: &Method, url: &str) -> ControlResponse {
        let path = url.split('?').next().unwrap_or(url);
        debug!("Control request: {} {}", method, path);

        if *method == Method::Get && path == "/info" {
            return ControlResponse::ok(ControlBody::Info {
                running: self.is_running(),
            });
        }

        if *method != Method::Post {
            return ControlResponse::error(400, "wrong method");
        }

        match path {
            "/start" => self.start(),
            "/stop" => self.stop(),
            _ => ControlResponse::error(404, "wrong path"),
        }
    }

    fn start(&mut self) -> ControlResponse {
        if self.is_running() {
            return ControlResponse::error(400, "already running");
        }

        match self.profiler.start(&self.label) {
            Ok(()) => ControlResponse::ok(ControlBody::Started { ok: true }),
            Err(e) => {
                warn!("Control server failed to start profiling: {}", e);
                ControlResponse::error(500, e.to_string())
            }
        }
    }

    fn stop(&mut self) -> ControlResponse {
        if !self.is_running() {
            return ControlResponse::error(400, "not running");
        }

        match self.collect() {
            Ok(tree) => ControlResponse::ok(ControlBody::Profile(tree)),
            Err(e) => {
                warn!("Control server failed to collect profile: {}", e);
                ControlResponse::error(500, e.to_string())
            }
        }
    }

    fn collect(&mut self) -> Result<NodeReport, ProfilerError> {
        let snapshot = self.profiler.stop(&self.label)?;
        let tree = walk(&snapshot.top()?)?;
        snapshot.release()?;

        info!(
            "Collected profile '{}' ({} nodes, {} hits)",
            self.label,
            tree.node_count(),
            tree.total_hits()
        );
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Frame, SampleTrigger, ShadowStackEngine, StackRecorder};
    use serde_json::{json, Value};

    fn state() -> (ControlState, StackRecorder, SampleTrigger) {
        let recorder = StackRecorder::new();
        let engine = ShadowStackEngine::manual(recorder.clone());
        let trigger = engine.trigger();
        (ControlState::new(Profiler::new(engine), "heatline"), recorder, trigger)
    }

    fn body(response: &ControlResponse) -> Value {
        serde_json::to_value(&response.body).unwrap()
    }

    #[test]
    fn test_info() {
        let (mut state, _recorder, _trigger) = state();
        let response = state.handle(&Method::Get, "/info");
        assert_eq!(response.status, 200);
        assert_eq!(body(&response), json!({ "running": false }));

        let response = state.handle(&Method::Get, "/info?verbose=1");
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_wrong_method_and_path() {
        let (mut state, _recorder, _trigger) = state();

        let response = state.handle(&Method::Get, "/start");
        assert_eq!(response.status, 400);
        assert_eq!(body(&response), json!({ "error": "wrong method" }));

        assert_eq!(state.handle(&Method::Put, "/stop").status, 400);
        assert_eq!(state.handle(&Method::Get, "/missing").status, 400);

        let response = state.handle(&Method::Post, "/missing");
        assert_eq!(response.status, 404);
        assert_eq!(body(&response), json!({ "error": "wrong path" }));
    }

    #[test]
    fn test_stop_when_not_running() {
        let (mut state, _recorder, _trigger) = state();
        let response = state.handle(&Method::Post, "/stop");
        assert_eq!(response.status, 400);
        assert_eq!(body(&response), json!({ "error": "not running" }));
    }

    #[test]
    fn test_session_lifecycle() {
        let (mut state, recorder, trigger) = state();

        let response = state.handle(&Method::Post, "/start");
        assert_eq!(response.status, 200);
        assert_eq!(body(&response), json!({ "ok": true }));

        let response = state.handle(&Method::Post, "/start");
        assert_eq!(response.status, 400);
        assert_eq!(body(&response), json!({ "error": "already running" }));
        assert_eq!(
            body(&state.handle(&Method::Get, "/info")),
            json!({ "running": true })
        );

        {
            let _f = recorder.enter(Frame::new("f", "app.js", 1, 1));
            recorder.set_line(2);
            trigger.sample_now();
            trigger.sample_now();
        }

        let response = state.handle(&Method::Post, "/stop");
        assert_eq!(response.status, 200);
        let tree = body(&response);
        assert_eq!(tree["name"], "(root)");
        assert_eq!(tree["children"][0]["name"], "f");
        assert_eq!(tree["children"][0]["hits"], 2);
        assert_eq!(tree["children"][0]["hitLines"], json!([{ "line": 2, "hitCount": 2 }]));

        assert!(!state.is_running());
        assert_eq!(state.handle(&Method::Post, "/stop").status, 400);
    }
}
