//! HTTP health endpoint.
//!
//! A tiny HTTP server on a background thread, separate from the game
//! listener so a wedged game loop is visible from the outside. Serves
//! `GET /health` with current world population; everything else is 404.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, Server};

use plaza_world::WorldCounters;

/// Errors from starting the health server.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind the HTTP listener.
    #[error("failed to bind health endpoint on port {port}: {error}")]
    BindError {
        /// The requested port.
        port: u16,
        /// The underlying bind failure.
        error: String,
    },
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    players: usize,
    objects: usize,
}

/// Background HTTP server answering liveness probes.
pub struct HealthServer {
    port: u16,
    actual_port: Option<u16>,
    handle: Option<JoinHandle<()>>,
}

impl HealthServer {
    /// Create a server for the given port. Nothing binds until
    /// [`HealthServer::start`].
    pub fn new(port: u16) -> Self {
        Self {
            port,
            actual_port: None,
            handle: None,
        }
    }

    /// Bind and start serving on a background thread.
    pub fn start(&mut self, counters: Arc<WorldCounters>) -> Result<(), HealthServerError> {
        let server = Server::http(format!("0.0.0.0:{}", self.port)).map_err(|e| {
            HealthServerError::BindError {
                port: self.port,
                error: e.to_string(),
            }
        })?;

        let actual_port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .unwrap_or(self.port);
        self.actual_port = Some(actual_port);

        let handle = thread::spawn(move || {
            Self::run_server(server, counters);
        });
        self.handle = Some(handle);
        Ok(())
    }

    /// The port actually bound (differs from the requested port when 0 was
    /// asked for).
    pub fn actual_port(&self) -> u16 {
        self.actual_port.unwrap_or(self.port)
    }

    /// Detach the serving thread.
    pub fn stop(&mut self) {
        // tiny_http has no graceful shutdown; the thread ends with the
        // process.
        if let Some(handle) = self.handle.take() {
            std::mem::forget(handle);
        }
    }

    fn run_server(server: Server, counters: Arc<WorldCounters>) {
        for request in server.incoming_requests() {
            if let Err(e) = Self::handle_request(request, &counters) {
                eprintln!("health endpoint error: {e}");
            }
        }
    }

    fn handle_request(
        request: Request,
        counters: &Arc<WorldCounters>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let response = match (request.method(), request.url()) {
            (&Method::Get, "/health") => {
                let body = HealthResponse {
                    ok: true,
                    players: counters.players(),
                    objects: counters.objects(),
                };
                let json = serde_json::to_string(&body)?;
                Response::from_string(json).with_header(
                    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap(),
                )
            }
            _ => Response::from_string("Not Found").with_status_code(404),
        };

        request.respond(response)?;
        Ok(())
    }
}

impl Drop for HealthServer {
    fn drop(&mut self) {
        self.stop();
    }
}
