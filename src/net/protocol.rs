use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::game::registry::{ConnectionId, PlayerState, PositionDelta};
use crate::world::level::{Exit, Level};

/// Protocol version carried in `Welcome`; bump on any wire-breaking change
pub const PROTOCOL_VERSION: u16 = 1;

/// Messages from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Register this connection's player with its initial state
    NewPlayer(PlayerState),
    /// Propose a new position; the server clamps and rebroadcasts
    MovePlayer(PlayerState),
    /// Informational: the client crossed into a chunk it generates locally.
    /// No server-side chunk authority exists.
    RequestChunk { chunk_x: i32, chunk_y: i32 },
    /// The player reached an exit region
    FinishedLevel,
    /// Opaque voice payload for verbatim relay
    VoiceData { player_id: ConnectionId, data: Vec<u8> },
}

/// Messages from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    /// First message on every connection: the id the server keys this
    /// connection's player under
    Welcome { id: ConnectionId, protocol_version: u16 },
    /// Full static level metadata, sent once on connect
    LevelInfo(Vec<Level>),
    /// Full registry snapshot, sent on connect/join/leave
    UpdatePlayers(HashMap<ConnectionId, PlayerState>),
    /// Incremental position update, sent on every accepted move
    UpdatePlayerPosition(PositionDelta),
    /// Exit geometry for the current level
    UpdateExit(Exit),
    /// Relayed voice payload, untouched by the server
    VoiceData { player_id: ConnectionId, data: Vec<u8> },
}

/// Encode a message using bincode's legacy config (fixed-size integers,
/// stable across client implementations)
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, EncodeError> {
    bincode::serde::encode_to_vec(message, bincode::config::legacy())
        .map_err(|e| EncodeError(e.to_string()))
}

/// Decode a message using bincode's legacy config
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, DecodeError> {
    bincode::serde::decode_from_slice(data, bincode::config::legacy())
        .map(|(msg, _)| msg)
        .map_err(|e| DecodeError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(String);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);
