//! Static level metadata
//!
//! The level set is built once at server start; each level carries a
//! cryptographically random seed that clients feed into the deterministic
//! chunk generator, so no geometry ever crosses the wire.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::game::constants::level;
use crate::util::rect::Rect;

/// Exit region within a level. Walking onto it completes the level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exit {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Level index this exit leads to
    pub target_level: u32,
}

impl Exit {
    pub fn new(x: f32, y: f32, target_level: u32) -> Self {
        Self {
            x,
            y,
            width: level::EXIT_SIZE,
            height: level::EXIT_SIZE,
            target_level,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Level metadata sent to every client on connect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Level {
    /// Hex-encoded random seed driving chunk generation for this level
    pub seed: String,
    /// Level index
    pub level: u32,
    pub name: String,
    pub width: f32,
    pub height: f32,
    /// Whether remote players are rendered on this level
    pub players_visible: bool,
    pub exits: Vec<Exit>,
}

impl Level {
    fn new(index: u32, name: &str, exits: Vec<Exit>) -> Self {
        Self {
            seed: random_seed(),
            level: index,
            name: name.to_string(),
            width: level::WIDTH,
            height: level::HEIGHT,
            players_visible: true,
            exits,
        }
    }

    /// Build the static level set, fresh seeds per server start
    pub fn default_set() -> Vec<Level> {
        vec![
            Level::new(0, "Start", vec![Exit::new(500.0, 500.0, 2)]),
            Level::new(1, "The Lobby", vec![Exit::new(500.0, 500.0, 2)]),
            Level::new(2, "Level 2", vec![Exit::new(10_000.0, 10_000.0, 1)]),
        ]
    }
}

/// Fresh random seed: `SEED_BYTES` bytes of CSPRNG output, hex-encoded
fn random_seed() -> String {
    let mut bytes = [0u8; level::SEED_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
