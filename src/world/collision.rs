//! Spatial queries against the generated world
//!
//! A moving entity occupies a `TILE_SIZE` square anchored at its top-left
//! corner; every query here is a plain AABB test over that tile.

use crate::game::constants::player;
use crate::util::rect::Rect;
use crate::util::vec2::Vec2;
use crate::world::level::Exit;
use crate::world::state::{Item, WorldState};

/// The tile a moving entity occupies when anchored at `position`
fn entity_tile(position: Vec2) -> Rect {
    Rect::new(position.x, position.y, player::TILE_SIZE, player::TILE_SIZE)
}

/// Whether an entity anchored at `position` collides with any wall.
///
/// A wall with a door gap is skipped entirely when the entity's anchor point
/// lies inside the gap - an anchor-point test, not a full-box test, so the
/// rest of the tile may overlap the wall while passing through a doorway and
/// passage depends on the approach angle.
pub fn blocked(world: &WorldState, position: Vec2) -> bool {
    let tile = entity_tile(position);
    for wall in &world.walls {
        if let Some(gap) = wall.door_gap_rect() {
            if gap.contains_point(position) {
                continue;
            }
        }
        if tile.overlaps(&wall.rect) {
            return true;
        }
    }
    false
}

/// Whether an entity anchored at `position` touches the exit region
pub fn at_exit(position: Vec2, exit: &Exit) -> bool {
    entity_tile(position).overlaps(&exit.rect())
}

/// Index of the first item whose tile the entity overlaps
pub fn item_at(world: &WorldState, position: Vec2) -> Option<usize> {
    let tile = entity_tile(position);
    world.items.iter().position(|item| {
        tile.overlaps(&Rect::new(
            item.position.x,
            item.position.y,
            player::TILE_SIZE,
            player::TILE_SIZE,
        ))
    })
}

/// Remove and return the item the entity overlaps, if any
pub fn collect_item(world: &mut WorldState, position: Vec2) -> Option<Item> {
    item_at(world, position).map(|index| world.take_item(index))
}
