//! TCP gateway: accepts connections and bridges them to the engine.
//!
//! The gateway never touches world state. Each accepted socket gets a
//! reader task that decodes frames into [`Intent`]s and a writer task that
//! drains the connection's outbound channel; the engine does everything
//! else. A malformed frame is dropped with a warning and the connection
//! survives; an oversized frame or any transport error ends it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::engine::Intent;
use crate::framing::{FrameConfig, FrameError, read_frame, write_frame};
use crate::messages::{ClientMessage, ServerMessage, decode, encode};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a connection within a server process. Doubles as
/// the player id for the session's registered player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

/// Atomic generator for monotonically increasing [`ConnectionId`]s.
/// Ids are never reused, so a stale intent can never alias a newer
/// connection.
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Create a generator starting at 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Return the next unique [`ConnectionId`].
    pub fn next_id(&self) -> ConnectionId {
        ConnectionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Configuration for [`Gateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address to bind to. Default: `0.0.0.0:3344`.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections. Default: 256.
    pub max_connections: usize,
    /// Capacity of each connection's outbound event channel. Default: 256.
    pub outbound_buffer: usize,
    /// Framing limits.
    pub frame: FrameConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3344)),
            max_connections: 256,
            outbound_buffer: 256,
            frame: FrameConfig::default(),
        }
    }
}

/// TCP accept loop plus per-connection reader/writer tasks.
pub struct Gateway {
    config: GatewayConfig,
    intents: mpsc::Sender<Intent>,
    active: Arc<AtomicUsize>,
    id_gen: Arc<IdGenerator>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Gateway {
    /// Create a gateway that feeds the given intent channel.
    pub fn new(config: GatewayConfig, intents: mpsc::Sender<Intent>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            intents,
            active: Arc::new(AtomicUsize::new(0)),
            id_gen: Arc::new(IdGenerator::new()),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Number of currently attached connections.
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Bind to the configured address and run the accept loop.
    ///
    /// A bind failure is the only fatal startup error.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!("listening on {}", self.config.bind_addr);
        self.run_with_listener(listener).await
    }

    /// Run the accept loop with a pre-bound listener (useful for tests).
    pub async fn run_with_listener(&self, listener: TcpListener) -> std::io::Result<()> {
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, peer_addr) = result?;
                    self.attach(stream, peer_addr).await;
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("gateway shutting down");
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Signal the accept loop to stop. Live connections drain naturally
    /// once the process exits; no further accepts happen.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    async fn attach(&self, stream: tokio::net::TcpStream, peer_addr: SocketAddr) {
        if self.active.load(Ordering::Relaxed) >= self.config.max_connections {
            warn!(%peer_addr, "connection limit reached, rejecting");
            return;
        }
        if let Err(e) = stream.set_nodelay(true) {
            debug!(%peer_addr, error = %e, "set_nodelay failed");
        }

        let id = self.id_gen.next_id();
        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.outbound_buffer);

        if self
            .intents
            .send(Intent::Connected {
                id,
                outbound: outbound_tx,
            })
            .await
            .is_err()
        {
            // Engine is gone; nothing left to serve.
            warn!(%peer_addr, "engine unavailable, dropping connection");
            return;
        }

        info!(connection = id.0, %peer_addr, "connection accepted");
        self.active.fetch_add(1, Ordering::Relaxed);

        let (reader, writer) = stream.into_split();
        let frame = self.config.frame.clone();

        tokio::spawn(writer_loop(id, writer, outbound_rx, frame.clone()));

        let intents = self.intents.clone();
        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            reader_loop(id, reader, &intents, &frame).await;
            let _ = intents.send(Intent::Disconnected { id }).await;
            active.fetch_sub(1, Ordering::Relaxed);
            info!(connection = id.0, "connection closed");
        });
    }
}

// ---------------------------------------------------------------------------
// Per-connection tasks
// ---------------------------------------------------------------------------

/// Decode inbound frames into intents until the transport ends.
///
/// Malformed payloads are frame-local failures: log, drop, keep reading.
async fn reader_loop(
    id: ConnectionId,
    mut reader: OwnedReadHalf,
    intents: &mpsc::Sender<Intent>,
    frame: &FrameConfig,
) {
    loop {
        let payload = match read_frame(&mut reader, frame).await {
            Ok(payload) => payload,
            Err(FrameError::Closed) => break,
            Err(e) => {
                debug!(connection = id.0, error = %e, "read failed, closing");
                break;
            }
        };

        match decode::<ClientMessage>(&payload) {
            Ok(message) => {
                if intents.send(Intent::Frame { id, message }).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(connection = id.0, error = %e, "dropping malformed frame");
            }
        }
    }
}

/// Drain the outbound channel onto the socket until either side ends.
async fn writer_loop(
    id: ConnectionId,
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<ServerMessage>,
    frame: FrameConfig,
) {
    while let Some(message) = outbound.recv().await {
        let payload = match encode(&message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(connection = id.0, error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = write_frame(&mut writer, &payload, &frame).await {
            debug!(connection = id.0, error = %e, "write failed, closing");
            break;
        }
    }
}
