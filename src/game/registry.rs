//! Server-authoritative player registry
//!
//! Single source of truth for every connected player's state, keyed by
//! connection id. The server trusts client-reported positions apart from a
//! bounds clamp; it runs no collision. Every mutation dictates a broadcast,
//! which the caller performs after the mutation returns - never before.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::constants::{level, player};
use crate::world::level::Level;
use crate::world::state::ChunkCoord;

/// Identity of a client connection, assigned by the server on accept
pub type ConnectionId = Uuid;

/// Player state as reported by clients and mirrored to all of them
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub current_chunk: ChunkCoord,
    pub flashlight: bool,
}

impl PlayerState {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            speed: player::BASE_SPEED,
            current_chunk: ChunkCoord::ORIGIN,
            flashlight: false,
        }
    }

    /// Coordinates are finite (rejects NaN/Infinity from the wire)
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::at(0.0, 0.0)
    }
}

/// Incremental position broadcast for a single player
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PositionDelta {
    pub id: ConnectionId,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegistryError {
    /// Move referenced a connection with no registered player - a no-op
    /// upstream, never fatal
    #[error("no player registered for connection {0}")]
    UnknownConnection(ConnectionId),
}

/// Authoritative mapping of connection id to player state
pub struct PlayerRegistry {
    players: HashMap<ConnectionId, PlayerState>,
    bounds_width: f32,
    bounds_height: f32,
}

impl PlayerRegistry {
    pub fn new(bounds_width: f32, bounds_height: f32) -> Self {
        Self {
            players: HashMap::new(),
            bounds_width,
            bounds_height,
        }
    }

    /// Bounds always come from the first level's dimensions, whichever level
    /// a player is on
    pub fn from_levels(levels: &[Level]) -> Self {
        match levels.first() {
            Some(first) => Self::new(first.width, first.height),
            None => Self::new(level::WIDTH, level::HEIGHT),
        }
    }

    /// Register a player. The caller must broadcast a full snapshot.
    pub fn join(&mut self, id: ConnectionId, state: PlayerState) {
        self.players.insert(id, state);
    }

    /// Apply a proposed move: clamp x/y independently to the level bounds,
    /// store the clamped position, and return the delta to broadcast. The
    /// delta always equals the stored value, never the raw proposal.
    pub fn apply_move(
        &mut self,
        id: ConnectionId,
        proposed: &PlayerState,
    ) -> Result<PositionDelta, RegistryError> {
        let player = self
            .players
            .get_mut(&id)
            .ok_or(RegistryError::UnknownConnection(id))?;

        let half_w = self.bounds_width / 2.0;
        let half_h = self.bounds_height / 2.0;
        player.x = proposed.x.clamp(-half_w, half_w);
        player.y = proposed.y.clamp(-half_h, half_h);

        Ok(PositionDelta {
            id,
            x: player.x,
            y: player.y,
        })
    }

    /// Remove a player. The caller must broadcast a full snapshot when this
    /// returns `Some`; removing an unknown id is a no-op.
    pub fn leave(&mut self, id: ConnectionId) -> Option<PlayerState> {
        self.players.remove(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Full-registry snapshot for `updatePlayers` broadcasts
    pub fn snapshot(&self) -> HashMap<ConnectionId, PlayerState> {
        self.players.clone()
    }
}
