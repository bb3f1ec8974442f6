//! Owned world model
//!
//! All generated geometry lives in a `WorldState` owned by the caller and
//! passed explicitly to the generator, collision and simulation - never in
//! module-level state. Geometry persists for the process lifetime; chunks
//! are generated once per key and never evicted.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::game::constants::{chunk, wall};
use crate::util::rect::Rect;
use crate::util::vec2::Vec2;

/// Chunk key: integer coordinates of a fixed-size square world region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub const ORIGIN: ChunkCoord = ChunkCoord { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing a world position
    pub fn containing(position: Vec2) -> Self {
        Self {
            x: (position.x / chunk::SIZE as f32).floor() as i32,
            y: (position.y / chunk::SIZE as f32).floor() as i32,
        }
    }

    /// World-space extent of this chunk
    pub fn extent(&self) -> Rect {
        Rect::new(
            (self.x * chunk::SIZE) as f32,
            (self.y * chunk::SIZE) as f32,
            chunk::SIZE as f32,
            chunk::SIZE as f32,
        )
    }
}

/// Perimeter wall segment with an optional door opening
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    pub rect: Rect,
    /// Top-left corner of the `DOOR_SIZE` square opening, if any
    pub door_gap: Option<Vec2>,
}

impl Wall {
    pub fn door_gap_rect(&self) -> Option<Rect> {
        self.door_gap
            .map(|gap| Rect::new(gap.x, gap.y, wall::DOOR_SIZE, wall::DOOR_SIZE))
    }
}

/// Collectible world item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub position: Vec2,
    pub kind: ItemKind,
}

/// Item identity; the wire id of `Flashlight` is 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Flashlight,
}

/// The generated world: rooms, walls, hallways, items and the set of chunk
/// keys already generated.
///
/// Invariant: no two rooms overlap - an overlapping candidate is merged into
/// the room it hits before it ever lands in `rooms`.
#[derive(Debug, Default)]
pub struct WorldState {
    pub rooms: Vec<Rect>,
    pub walls: Vec<Wall>,
    pub hallways: Vec<Rect>,
    pub items: Vec<Item>,
    /// Position the local player spawns at, discovered while generating the
    /// origin chunk
    pub spawn_point: Option<Vec2>,
    generated: FxHashSet<ChunkCoord>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_generated(&self, coord: ChunkCoord) -> bool {
        self.generated.contains(&coord)
    }

    pub fn mark_generated(&mut self, coord: ChunkCoord) {
        self.generated.insert(coord);
    }

    pub fn generated_chunks(&self) -> usize {
        self.generated.len()
    }

    /// Append the four perimeter walls of a room
    pub fn add_room_walls(&mut self, room: &Rect) {
        self.walls.extend(perimeter_walls(room));
    }

    /// Remove and return the item at `index`
    pub fn take_item(&mut self, index: usize) -> Item {
        self.items.remove(index)
    }
}

/// Four perimeter wall segments for a room, each `THICKNESS` thick with a
/// door gap centered on its side
pub fn perimeter_walls(room: &Rect) -> SmallVec<[Wall; 4]> {
    let t = wall::THICKNESS;
    let door = wall::DOOR_SIZE;
    let mut walls = SmallVec::new();

    // Top
    walls.push(Wall {
        rect: Rect::new(room.x, room.y, room.width, t),
        door_gap: Some(Vec2::new(room.x + room.width / 2.0 - door / 2.0, room.y)),
    });
    // Bottom
    walls.push(Wall {
        rect: Rect::new(room.x, room.bottom() - t, room.width, t),
        door_gap: Some(Vec2::new(
            room.x + room.width / 2.0 - door / 2.0,
            room.bottom() - t,
        )),
    });
    // Left
    walls.push(Wall {
        rect: Rect::new(room.x, room.y, t, room.height),
        door_gap: Some(Vec2::new(room.x, room.y + room.height / 2.0 - door / 2.0)),
    });
    // Right
    walls.push(Wall {
        rect: Rect::new(room.right() - t, room.y, t, room.height),
        door_gap: Some(Vec2::new(
            room.right() - t,
            room.y + room.height / 2.0 - door / 2.0,
        )),
    });

    walls
}
