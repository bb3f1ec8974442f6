/// Chunk constants - the world is generated in fixed-size square chunks
pub mod chunk {
    /// Side length of a chunk in world units
    pub const SIZE: i32 = 800;
}

/// Room generation constants
pub mod room {
    /// Minimum room side length
    pub const MIN_SIZE: i32 = 50;
    /// Maximum room side length
    pub const MAX_SIZE: i32 = 200;
    /// Minimum rooms drawn per chunk
    pub const MIN_PER_CHUNK: u32 = 5;
    /// Maximum rooms drawn per chunk
    pub const MAX_PER_CHUNK: u32 = 10;
    /// Chance that a room contains a flashlight pickup at its center
    pub const ITEM_CHANCE: f64 = 0.1;
}

/// Wall constants
pub mod wall {
    /// Thickness of perimeter wall segments
    pub const THICKNESS: f32 = 10.0;
    /// Side length of the square door opening left in each wall segment
    pub const DOOR_SIZE: f32 = 20.0;
}

/// Hallway constants
pub mod hallway {
    /// Width of the narrow hallway dimension
    pub const WIDTH: f32 = 10.0;
    /// Chance that a pair of rooms is connected by a hallway
    pub const CONNECT_CHANCE: f64 = 0.5;
    /// Chance that a hallway gets an L-shape bend segment
    pub const BEND_CHANCE: f64 = 0.5;
}

/// Player movement constants
pub mod player {
    /// Side length of the square a moving entity occupies
    pub const TILE_SIZE: f32 = 10.0;
    /// Distance moved per simulation tick
    pub const BASE_SPEED: f32 = 5.0;
    /// Client simulation rate in Hz
    pub const TICK_RATE: u32 = 60;
    /// Tick duration in milliseconds
    pub const TICK_DURATION_MS: u64 = 1000 / TICK_RATE as u64;
}

/// Level constants
pub mod level {
    /// Level width in world units
    pub const WIDTH: f32 = 10_000.0;
    /// Level height in world units
    pub const HEIGHT: f32 = 10_000.0;
    /// Bytes of entropy per level seed (rendered as hex on the wire)
    pub const SEED_BYTES: usize = 32;
    /// Side length of the square exit region
    pub const EXIT_SIZE: f32 = 50.0;
}

/// Networking constants
pub mod net {
    /// Maximum framed message size
    pub const MAX_MESSAGE_SIZE: usize = 65536;
    /// Transport keep-alive probe interval in seconds
    pub const KEEP_ALIVE_INTERVAL_SECS: u64 = 10;
    /// Idle timeout in seconds - probe interval plus the grace allowed for
    /// a probe response
    pub const IDLE_TIMEOUT_SECS: u64 = 15;
}
