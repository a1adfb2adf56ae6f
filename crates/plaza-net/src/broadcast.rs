//! Event fan-out to connected clients.
//!
//! The engine hands each connection a bounded outbound channel at accept
//! time and routes events through this table. Delivery uses `try_send`
//! only: a slow consumer loses events instead of stalling the engine, and
//! other recipients are unaffected.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::gateway::ConnectionId;
use crate::messages::ServerMessage;

/// Outbound channels for every live connection.
#[derive(Debug, Default)]
pub struct Fanout {
    connections: HashMap<ConnectionId, mpsc::Sender<ServerMessage>>,
}

impl Fanout {
    /// Create an empty fan-out table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a connection's outbound channel.
    pub fn insert(&mut self, id: ConnectionId, outbound: mpsc::Sender<ServerMessage>) {
        self.connections.insert(id, outbound);
    }

    /// Stop tracking a connection. Safe to call twice.
    pub fn remove(&mut self, id: ConnectionId) {
        self.connections.remove(&id);
    }

    /// Number of tracked connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connections are tracked.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Deliver an event to one connection.
    pub fn send_to(&self, id: ConnectionId, message: ServerMessage) {
        if let Some(outbound) = self.connections.get(&id) {
            Self::deliver(id, outbound, message);
        }
    }

    /// Deliver an event to every connection except the originator.
    pub fn broadcast_except(&self, origin: ConnectionId, message: &ServerMessage) {
        for (&id, outbound) in &self.connections {
            if id != origin {
                Self::deliver(id, outbound, message.clone());
            }
        }
    }

    /// Deliver an event to every connection, originator included.
    pub fn broadcast_all(&self, message: &ServerMessage) {
        for (&id, outbound) in &self.connections {
            Self::deliver(id, outbound, message.clone());
        }
    }

    fn deliver(id: ConnectionId, outbound: &mpsc::Sender<ServerMessage>, message: ServerMessage) {
        match outbound.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(connection = id.0, "outbound buffer full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // Writer task already exited; the disconnect intent is in
                // flight and will clean this entry up.
                debug!(connection = id.0, "outbound channel closed");
            }
        }
    }
}
