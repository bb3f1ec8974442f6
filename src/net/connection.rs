use std::time::Instant;

use hashbrown::HashMap;

use crate::game::registry::ConnectionId;

/// Per-connection protocol state
///
/// `Connected → Joined → (Moving | Transitioning) → Disconnected`.
/// Joining happens on `newPlayer`; movement and level-finish messages are
/// only honored once joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport established, no player registered yet
    Connected,
    /// Player registered via `newPlayer`
    Joined,
    /// At least one accepted move since joining
    Moving,
    /// Reported `finishedLevel`; further moves return to `Moving`
    Transitioning,
    /// Transport gone; the registry entry is removed alongside
    Disconnected,
}

/// Client connection bookkeeping
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub state: ConnectionState,
    pub created_at: Instant,
    pub last_activity: Instant,
    pub bytes_received: u64,
    pub messages_received: u64,
}

impl Connection {
    pub fn new(id: ConnectionId) -> Self {
        let now = Instant::now();
        Self {
            id,
            state: ConnectionState::Connected,
            created_at: now,
            last_activity: now,
            bytes_received: 0,
            messages_received: 0,
        }
    }

    /// Update last activity timestamp
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Record an inbound message
    pub fn record_received(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
        self.messages_received += 1;
        self.touch();
    }

    /// Whether a player is registered for this connection
    pub fn is_joined(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Joined | ConnectionState::Moving | ConnectionState::Transitioning
        )
    }

    /// `newPlayer` received. Valid from any live state; a repeated join
    /// re-registers the player.
    pub fn mark_joined(&mut self) {
        if self.state != ConnectionState::Disconnected {
            self.state = ConnectionState::Joined;
        }
    }

    /// An accepted move. Only meaningful once joined.
    pub fn mark_moving(&mut self) {
        if self.is_joined() {
            self.state = ConnectionState::Moving;
        }
    }

    /// `finishedLevel` received
    pub fn mark_transitioning(&mut self) {
        if self.is_joined() {
            self.state = ConnectionState::Transitioning;
        }
    }

    pub fn mark_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    pub fn idle_time(&self) -> std::time::Duration {
        self.last_activity.elapsed()
    }
}

/// Live connection table
pub struct ConnectionManager {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    pub fn insert(&mut self, connection: Connection) {
        self.connections.insert(connection.id, connection);
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
