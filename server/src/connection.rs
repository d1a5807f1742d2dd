//! Per-connection lifecycle state.
//!
//! A connection is in exactly one of three states. The user state carries
//! the player's entity id and name, so the invariant holds by construction.
//! Connections never leave the table mid-tick; a close or protocol error is
//! recorded here and acted on by the end-of-tick sweep.

use shared::protocol::{ServerToClientMessage, WireFormat};
use shared::Keyed;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Unauthenticated,
    User { entity_id: u32, name: String },
    Spectator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The transport closed.
    Closed,
    /// A frame could not be decoded.
    ProtocolError,
    /// An outgoing batch could not be encoded.
    EncodeError,
    InputTimeout,
    PingTimeout,
    SpectatorExpired,
}

#[derive(Debug)]
pub struct Connection {
    pub id: u32,
    pub state: ConnectionState,
    pub last_action: Instant,
    pub last_ping: Instant,
    pub spectator_join: Option<Instant>,
    /// Wire format of the last frame received; replies use the same.
    pub wire_format: WireFormat,
    /// Messages queued this tick, flushed as one frame.
    pub outbound: Vec<ServerToClientMessage>,
    pub pending_close: Option<DisconnectReason>,
}

impl Keyed for Connection {
    fn key(&self) -> u32 {
        self.id
    }
}

/// Timeout windows checked by the sweep.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub input: Duration,
    pub ping: Duration,
    pub spectator: Duration,
}

impl Connection {
    pub fn new(id: u32, now: Instant, wire_format: WireFormat) -> Self {
        Self {
            id,
            state: ConnectionState::Unauthenticated,
            last_action: now,
            last_ping: now,
            spectator_join: None,
            wire_format,
            outbound: Vec::new(),
            pending_close: None,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self.state, ConnectionState::User { .. })
    }

    pub fn is_spectator(&self) -> bool {
        self.state == ConnectionState::Spectator
    }

    pub fn user_entity_id(&self) -> Option<u32> {
        match &self.state {
            ConnectionState::User { entity_id, .. } => Some(*entity_id),
            _ => None,
        }
    }

    pub fn user_name(&self) -> Option<&str> {
        match &self.state {
            ConnectionState::User { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Queues a message for this tick's frame. Closed connections drop it.
    pub fn send(&mut self, message: ServerToClientMessage) {
        if self.pending_close.is_none() {
            self.outbound.push(message);
        }
    }

    /// Why this connection should be dropped at `now`, if at all.
    pub fn expired(&self, now: Instant, timeouts: &Timeouts) -> Option<DisconnectReason> {
        if let Some(reason) = self.pending_close {
            return Some(reason);
        }
        if self.is_user() && now.saturating_duration_since(self.last_action) > timeouts.input {
            return Some(DisconnectReason::InputTimeout);
        }
        if let Some(joined) = self.spectator_join {
            if self.is_spectator() && now.saturating_duration_since(joined) > timeouts.spectator {
                return Some(DisconnectReason::SpectatorExpired);
            }
        }
        if now.saturating_duration_since(self.last_ping) > timeouts.ping {
            return Some(DisconnectReason::PingTimeout);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeouts() -> Timeouts {
        Timeouts {
            input: Duration::from_secs(120),
            ping: Duration::from_secs(30),
            spectator: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_fresh_connection_is_alive() {
        let now = Instant::now();
        let connection = Connection::new(1, now, WireFormat::Binary);
        assert_eq!(connection.state, ConnectionState::Unauthenticated);
        assert_eq!(connection.expired(now, &timeouts()), None);
    }

    #[test]
    fn test_ping_timeout() {
        let now = Instant::now();
        let connection = Connection::new(1, now, WireFormat::Binary);
        let later = now + Duration::from_secs(31);
        assert_eq!(
            connection.expired(later, &timeouts()),
            Some(DisconnectReason::PingTimeout)
        );
    }

    #[test]
    fn test_input_timeout_only_for_users() {
        let now = Instant::now();
        let mut connection = Connection::new(1, now, WireFormat::Binary);
        let later = now + Duration::from_secs(121);
        connection.last_ping = later;
        assert_eq!(connection.expired(later, &timeouts()), None);

        connection.state = ConnectionState::User {
            entity_id: 3,
            name: "Ann".to_string(),
        };
        assert_eq!(
            connection.expired(later, &timeouts()),
            Some(DisconnectReason::InputTimeout)
        );
    }

    #[test]
    fn test_spectator_expires() {
        let now = Instant::now();
        let mut connection = Connection::new(1, now, WireFormat::Binary);
        connection.state = ConnectionState::Spectator;
        connection.spectator_join = Some(now);
        let later = now + Duration::from_secs(31);
        connection.last_ping = later;
        assert_eq!(
            connection.expired(later, &timeouts()),
            Some(DisconnectReason::SpectatorExpired)
        );
    }

    #[test]
    fn test_pending_close_drops_outbound() {
        let now = Instant::now();
        let mut connection = Connection::new(1, now, WireFormat::Binary);
        connection.pending_close = Some(DisconnectReason::Closed);
        connection.send(ServerToClientMessage::Pong { ping: 1 });
        assert!(connection.outbound.is_empty());
        assert_eq!(
            connection.expired(now, &timeouts()),
            Some(DisconnectReason::Closed)
        );
    }
}
