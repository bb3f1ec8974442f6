//! Client-side local simulation
//!
//! Each client simulates its own movement against locally generated
//! geometry and mirrors every other player read-only. The embedding client
//! drives `step` at the simulation tick rate and forwards the returned
//! events to the server; rendering and input mapping live outside this
//! crate.

use hashbrown::HashMap;
use tracing::debug;

use crate::game::registry::{ConnectionId, PlayerState};
use crate::net::protocol::ServerMessage;
use crate::util::vec2::Vec2;
use crate::world::collision;
use crate::world::generator;
use crate::world::level::{Exit, Level};
use crate::world::state::{ChunkCoord, ItemKind, WorldState};

/// Events a simulation step surfaces to the embedding client
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    /// The player crossed into a new chunk; inform the server
    RequestChunk(ChunkCoord),
    /// The player is standing on the exit region
    FinishedLevel,
    /// An item was collected this step
    PickedUp(ItemKind),
}

/// Local world model plus the authoritative-for-self player state
pub struct ClientSim {
    /// Connection id assigned by the server, known after `Welcome`
    pub id: Option<ConnectionId>,
    /// The locally simulated player
    pub player: PlayerState,
    /// Read-only replicas of every player the server broadcasts
    pub remote_players: HashMap<ConnectionId, PlayerState>,
    pub world: WorldState,
    pub levels: Vec<Level>,
    pub current_level: u32,
    /// Exit geometry for the current level, once the server announces it
    pub exit: Option<Exit>,
    seed: Option<String>,
}

impl ClientSim {
    pub fn new() -> Self {
        Self {
            id: None,
            player: PlayerState::default(),
            remote_players: HashMap::new(),
            world: WorldState::new(),
            levels: Vec::new(),
            current_level: 0,
            exit: None,
            seed: None,
        }
    }

    /// Generate the origin chunk from `seed` and place the player at the
    /// spawn point it yields
    pub fn bootstrap(&mut self, seed: &str) {
        self.seed = Some(seed.to_string());
        if let Some(spawn) = generator::generate_chunk(&mut self.world, ChunkCoord::ORIGIN, seed) {
            self.player.x = spawn.x;
            self.player.y = spawn.y;
            self.player.current_chunk = ChunkCoord::ORIGIN;
        }
    }

    /// Advance one simulation tick in `direction` (unit axis components).
    ///
    /// The proposed position is rejected atomically on collision - the
    /// player does not slide along the free axis.
    pub fn step(&mut self, direction: Vec2) -> Vec<SimEvent> {
        let mut events = Vec::new();

        let proposed = Vec2::new(self.player.x, self.player.y) + direction * self.player.speed;
        if !collision::blocked(&self.world, proposed) {
            self.player.x = proposed.x;
            self.player.y = proposed.y;
        }
        let position = Vec2::new(self.player.x, self.player.y);

        if let Some(exit) = &self.exit {
            if collision::at_exit(position, exit) {
                events.push(SimEvent::FinishedLevel);
            }
        }

        let chunk = ChunkCoord::containing(position);
        if chunk != self.player.current_chunk {
            self.player.current_chunk = chunk;
            if let Some(seed) = self.seed.clone() {
                generator::generate_chunk(&mut self.world, chunk, &seed);
            }
            events.push(SimEvent::RequestChunk(chunk));
        }

        if let Some(item) = collision::collect_item(&mut self.world, position) {
            match item.kind {
                ItemKind::Flashlight => self.player.flashlight = true,
            }
            events.push(SimEvent::PickedUp(item.kind));
        }

        events
    }

    /// Merge a server broadcast into the local model
    pub fn apply_server_message(&mut self, msg: &ServerMessage) {
        match msg {
            ServerMessage::Welcome { id, .. } => {
                self.id = Some(*id);
            }
            ServerMessage::LevelInfo(levels) => {
                self.levels = levels.clone();
                if self.seed.is_none() {
                    let seed = self
                        .levels
                        .iter()
                        .find(|l| l.level == self.current_level)
                        .map(|l| l.seed.clone());
                    if let Some(seed) = seed {
                        self.bootstrap(&seed);
                    }
                }
            }
            ServerMessage::UpdatePlayers(players) => {
                self.remote_players = players.clone();
            }
            ServerMessage::UpdatePlayerPosition(delta) => {
                if let Some(player) = self.remote_players.get_mut(&delta.id) {
                    player.x = delta.x;
                    player.y = delta.y;
                }
                // The server's clamp is authoritative for our own position
                if self.id == Some(delta.id) {
                    self.player.x = delta.x;
                    self.player.y = delta.y;
                }
            }
            ServerMessage::UpdateExit(exit) => {
                self.exit = Some(exit.clone());
            }
            ServerMessage::VoiceData { player_id, .. } => {
                // Audio playback is outside this crate
                debug!("voice frame from {}", player_id);
            }
        }
    }
}

impl Default for ClientSim {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::wall;
    use crate::net::protocol::PROTOCOL_VERSION;
    use crate::util::rect::Rect;
    use crate::world::state::{Item, Wall};
    use uuid::Uuid;

    /// Sim with a vertical wall at x=100 (no door) and the player just left
    /// of it - one step right collides, vertical movement is free
    fn sim_against_wall() -> ClientSim {
        let mut sim = ClientSim::new();
        sim.world.walls.push(Wall {
            rect: Rect::new(100.0, 0.0, wall::THICKNESS, 200.0),
            door_gap: None,
        });
        sim.player.x = 88.0;
        sim.player.y = 50.0;
        sim
    }

    #[test]
    fn test_free_movement_applies() {
        let mut sim = sim_against_wall();
        let events = sim.step(Vec2::new(0.0, 1.0));
        assert!(events.is_empty());
        assert_eq!(sim.player.x, 88.0);
        assert_eq!(sim.player.y, 55.0);
    }

    #[test]
    fn test_blocked_movement_rejected_atomically() {
        let mut sim = sim_against_wall();
        // Diagonal into the wall: x collides, y alone would be free, but the
        // whole proposal is rejected
        sim.step(Vec2::new(1.0, 1.0));
        assert_eq!(sim.player.x, 88.0);
        assert_eq!(sim.player.y, 50.0);
    }

    #[test]
    fn test_pickup_sets_flashlight_and_removes_item() {
        let mut sim = ClientSim::new();
        sim.player.x = 100.0;
        sim.player.y = 100.0;
        sim.world.items.push(Item {
            position: Vec2::new(103.0, 103.0),
            kind: ItemKind::Flashlight,
        });

        let events = sim.step(Vec2::ZERO);
        assert_eq!(events, vec![SimEvent::PickedUp(ItemKind::Flashlight)]);
        assert!(sim.player.flashlight);
        assert!(sim.world.items.is_empty());

        // A second step finds nothing to collect
        assert!(sim.step(Vec2::ZERO).is_empty());
    }

    #[test]
    fn test_chunk_crossing_emits_request_and_generates() {
        let mut sim = ClientSim::new();
        sim.bootstrap("worldSeed");
        sim.player.x = 798.0;
        sim.player.y = 5.0;
        sim.world.walls.clear();

        let events = sim.step(Vec2::new(1.0, 0.0));
        assert!(events.contains(&SimEvent::RequestChunk(ChunkCoord::new(1, 0))));
        assert_eq!(sim.player.current_chunk, ChunkCoord::new(1, 0));
        assert!(sim.world.is_generated(ChunkCoord::new(1, 0)));
    }

    #[test]
    fn test_exit_detection() {
        let mut sim = ClientSim::new();
        sim.exit = Some(Exit::new(500.0, 500.0, 2));
        sim.player.x = 495.0;
        sim.player.y = 520.0;

        let events = sim.step(Vec2::ZERO);
        assert!(events.contains(&SimEvent::FinishedLevel));
    }

    #[test]
    fn test_bootstrap_places_player_at_spawn() {
        let mut sim = ClientSim::new();
        sim.bootstrap("worldSeed");
        let spawn = sim.world.spawn_point.expect("origin chunk spawns the player");
        assert_eq!(Vec2::new(sim.player.x, sim.player.y), spawn);
        assert!(sim.world.is_generated(ChunkCoord::ORIGIN));
    }

    #[test]
    fn test_level_info_bootstraps_once() {
        let mut sim = ClientSim::new();
        let levels = Level::default_set();
        sim.apply_server_message(&ServerMessage::LevelInfo(levels.clone()));
        assert_eq!(sim.levels, levels);
        assert!(sim.world.is_generated(ChunkCoord::ORIGIN));

        let rooms = sim.world.rooms.clone();
        // A repeated LevelInfo does not regenerate or reseed
        sim.apply_server_message(&ServerMessage::LevelInfo(levels));
        assert_eq!(sim.world.rooms, rooms);
    }

    #[test]
    fn test_welcome_assigns_id() {
        let mut sim = ClientSim::new();
        let id = Uuid::new_v4();
        sim.apply_server_message(&ServerMessage::Welcome {
            id,
            protocol_version: PROTOCOL_VERSION,
        });
        assert_eq!(sim.id, Some(id));
    }

    #[test]
    fn test_snapshot_replaces_remote_players() {
        let mut sim = ClientSim::new();
        let a = Uuid::new_v4();
        let mut players = HashMap::new();
        players.insert(a, PlayerState::at(1.0, 2.0));
        sim.apply_server_message(&ServerMessage::UpdatePlayers(players));
        assert_eq!(sim.remote_players.len(), 1);

        sim.apply_server_message(&ServerMessage::UpdatePlayers(HashMap::new()));
        assert!(sim.remote_players.is_empty());
    }

    #[test]
    fn test_delta_updates_remote_player() {
        let mut sim = ClientSim::new();
        let a = Uuid::new_v4();
        let mut players = HashMap::new();
        players.insert(a, PlayerState::at(0.0, 0.0));
        sim.apply_server_message(&ServerMessage::UpdatePlayers(players));

        sim.apply_server_message(&ServerMessage::UpdatePlayerPosition(
            crate::game::registry::PositionDelta { id: a, x: 7.0, y: 8.0 },
        ));
        assert_eq!(sim.remote_players[&a].x, 7.0);
        assert_eq!(sim.remote_players[&a].y, 8.0);
        // Not our own id, local player untouched
        assert_eq!(sim.player.x, 0.0);
    }

    #[test]
    fn test_self_delta_reconciles_local_position() {
        let mut sim = ClientSim::new();
        let me = Uuid::new_v4();
        sim.apply_server_message(&ServerMessage::Welcome {
            id: me,
            protocol_version: PROTOCOL_VERSION,
        });
        sim.player.x = 6000.0;

        sim.apply_server_message(&ServerMessage::UpdatePlayerPosition(
            crate::game::registry::PositionDelta { id: me, x: 5000.0, y: 0.0 },
        ));
        assert_eq!(sim.player.x, 5000.0);
    }

    #[test]
    fn test_update_exit_stores_geometry() {
        let mut sim = ClientSim::new();
        let exit = Exit::new(500.0, 500.0, 2);
        sim.apply_server_message(&ServerMessage::UpdateExit(exit.clone()));
        assert_eq!(sim.exit, Some(exit));
    }
}
