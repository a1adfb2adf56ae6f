//! Connection session lifecycle.
//!
//! A session walks `Connected → Registered → Disconnected` and never moves
//! backwards. The table is owned by the engine task alone, so every
//! transition is atomic with respect to the world mutation it gates.

use std::collections::HashMap;

use crate::gateway::ConnectionId;

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Lifecycle state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport is up, no player registered yet.
    Connected,
    /// A player record exists for this connection.
    Registered,
    /// Terminal. Only ever observed as a return value from
    /// [`SessionTable::on_disconnect`].
    Disconnected,
}

/// Result of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// First registration for this connection.
    Registered,
    /// The connection was already registered; the caller re-acknowledges
    /// without mutating the world.
    AlreadyRegistered,
    /// No live session for this id (raced with a disconnect). Drop the
    /// intent.
    NotConnected,
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Session state for every live connection.
#[derive(Debug, Default)]
pub struct SessionTable {
    states: HashMap<ConnectionId, SessionState>,
}

impl SessionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh connection in the `Connected` state.
    pub fn on_connect(&mut self, id: ConnectionId) {
        self.states.insert(id, SessionState::Connected);
    }

    /// Attempt the `Connected → Registered` transition.
    pub fn register(&mut self, id: ConnectionId) -> RegisterOutcome {
        match self.states.get_mut(&id) {
            Some(state @ SessionState::Connected) => {
                *state = SessionState::Registered;
                RegisterOutcome::Registered
            }
            Some(SessionState::Registered) => RegisterOutcome::AlreadyRegistered,
            Some(SessionState::Disconnected) | None => RegisterOutcome::NotConnected,
        }
    }

    /// Whether the connection has a registered player.
    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.states.get(&id) == Some(&SessionState::Registered)
    }

    /// Remove the session and return the state it held, or `None` if the
    /// connection was never tracked (double-disconnect is tolerated).
    pub fn on_disconnect(&mut self, id: ConnectionId) -> Option<SessionState> {
        self.states.remove(&id)
    }

    /// Number of live sessions, registered or not.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_then_register() {
        let mut table = SessionTable::new();
        table.on_connect(ConnectionId(1));
        assert!(!table.is_registered(ConnectionId(1)));
        assert_eq!(table.register(ConnectionId(1)), RegisterOutcome::Registered);
        assert!(table.is_registered(ConnectionId(1)));
    }

    #[test]
    fn test_second_register_reports_already_registered() {
        let mut table = SessionTable::new();
        table.on_connect(ConnectionId(1));
        table.register(ConnectionId(1));
        assert_eq!(
            table.register(ConnectionId(1)),
            RegisterOutcome::AlreadyRegistered
        );
    }

    #[test]
    fn test_register_unknown_connection_is_rejected() {
        let mut table = SessionTable::new();
        assert_eq!(
            table.register(ConnectionId(9)),
            RegisterOutcome::NotConnected
        );
    }

    #[test]
    fn test_disconnect_returns_last_state() {
        let mut table = SessionTable::new();
        table.on_connect(ConnectionId(1));
        table.on_connect(ConnectionId(2));
        table.register(ConnectionId(2));

        assert_eq!(
            table.on_disconnect(ConnectionId(1)),
            Some(SessionState::Connected)
        );
        assert_eq!(
            table.on_disconnect(ConnectionId(2)),
            Some(SessionState::Registered)
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_double_disconnect_is_tolerated() {
        let mut table = SessionTable::new();
        table.on_connect(ConnectionId(1));
        assert!(table.on_disconnect(ConnectionId(1)).is_some());
        assert!(table.on_disconnect(ConnectionId(1)).is_none());
    }

    #[test]
    fn test_register_after_disconnect_is_rejected() {
        let mut table = SessionTable::new();
        table.on_connect(ConnectionId(1));
        table.on_disconnect(ConnectionId(1));
        assert_eq!(
            table.register(ConnectionId(1)),
            RegisterOutcome::NotConnected
        );
    }
}
