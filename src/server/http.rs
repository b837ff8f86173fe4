//! HTTP transport for the control routes, on a blocking `tiny_http` server.

use super::routes::{ControlResponse, ControlState};
use crate::utils::error::ServerError;
use log::{debug, info, warn};
use std::io::Cursor;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// How long a receive waits before the shutdown flag is checked again
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Control server bound to a socket, not yet serving
pub struct ControlServer {
    server: Server,
    state: ControlState,
    stop_requested: Arc<AtomicBool>,
}

impl std::fmt::Debug for ControlServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlServer")
            .field("addr", &self.server.server_addr())
            .field("stop_requested", &self.stop_requested)
            .finish_non_exhaustive()
    }
}

impl ControlServer {
    /// Bind the listening socket
    ///
    /// # Errors
    /// * `ServerError::Bind` - address unavailable or unresolvable
    pub fn bind(addr: impl ToSocketAddrs, state: ControlState) -> Result<Self, ServerError> {
        let server = Server::http(addr).map_err(|e| ServerError::Bind(e.to_string()))?;
        info!("Control server listening on http://{}", server.server_addr());

        Ok(Self {
            server,
            state,
            stop_requested: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.server_addr()
    }

    /// Serve requests on the calling thread until a shutdown is requested
    pub fn serve(mut self) -> Result<(), ServerError> {
        while !self.stop_requested.load(Ordering::Acquire) {
            if let Some(request) = self.server.recv_timeout(POLL_INTERVAL)? {
                self.respond(request);
            }
        }

        if self.state.is_running() {
            warn!(
                "Control server stopped while session '{}' was still running",
                self.state.label()
            );
        }
        info!("Control server on {} stopped", self.local_addr());
        Ok(())
    }

    /// Serve on a background thread
    ///
    /// # Errors
    /// * `ServerError::Io` - the thread could not be spawned
    pub fn spawn(self) -> Result<ServerHandle, ServerError> {
        let addr = self.local_addr();
        let stop_requested = Arc::clone(&self.stop_requested);
        let thread = thread::Builder::new()
            .name("heatline-control".to_string())
            .spawn(move || self.serve())?;

        Ok(ServerHandle {
            addr,
            stop_requested,
            thread: Some(thread),
        })
    }

    fn respond(&mut self, request: Request) {
        let response = self.state.handle(request.method(), request.url());
        debug!(
            "{} {} -> {}",
            request.method(),
            request.url(),
            response.status
        );

        if let Err(e) = request.respond(to_http(&response)) {
            warn!("Failed to send control response: {}", e);
        }
    }
}

fn to_http(response: &ControlResponse) -> Response<Cursor<Vec<u8>>> {
    let (status, body) = match serde_json::to_vec(&response.body) {
        Ok(body) => (response.status, body),
        Err(e) => {
            warn!("Failed to serialize control response: {}", e);
            (500, br#"{"error":"serialization failed"}"#.to_vec())
        }
    };

    let mut http = Response::from_data(body).with_status_code(StatusCode(status));
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        http = http.with_header(header);
    }
    http
}

/// Handle to a control server running on its own thread.
///
/// Dropping the handle shuts the server down.
pub struct ServerHandle {
    addr: SocketAddr,
    stop_requested: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<(), ServerError>>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting requests and wait for the server thread
    ///
    /// # Errors
    /// * `ServerError::Io` - the receive loop failed
    /// * `ServerError::Panicked` - the server thread panicked
    pub fn shutdown(mut self) -> Result<(), ServerError> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Result<(), ServerError> {
        self.stop_requested.store(true, Ordering::Release);
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| ServerError::Panicked)?,
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop_and_join() {
            warn!("Control server did not shut down cleanly: {}", e);
        }
    }
}
