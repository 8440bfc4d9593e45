//! World state for one session
//!
//! Everything the simulation mutates lives here. Randomness comes from a
//! session-scoped PCG stream so a world built from a fixed seed replays
//! identically.

use std::f32::consts::TAU;

use glam::Vec2;
use indexmap::IndexMap;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::dungeon::{Dungeon, RoomCoord, RoomKind};
use super::entity::{Bullet, Enemy, IdCounters, Player, PlayerId};
use crate::catalog::EnemyKind;
use crate::consts::*;
use crate::room_center;

/// Enemy cap for a regular room
pub const MAX_ROOM_ENEMIES: usize = 8;
/// Regular spawns keep at least this far from the room centre
const SPAWN_CLEARANCE: f32 = 150.0;
const SPAWN_TRIES: u32 = 20;
/// Boss spawns this far above the centre
const BOSS_SPAWN_OFFSET: f32 = 80.0;

/// Player start offsets around the room centre, by join order
const START_OFFSETS: [Vec2; 4] = [
    Vec2::new(-30.0, 0.0),
    Vec2::new(30.0, 0.0),
    Vec2::new(0.0, -30.0),
    Vec2::new(0.0, 30.0),
];

#[derive(Debug, Clone)]
pub struct World {
    /// Current floor (1-based)
    pub floor: u32,
    pub kills: u32,
    pub dungeon: Dungeon,
    /// Insertion-ordered by join
    pub players: IndexMap<PlayerId, Player>,
    pub bullets: Vec<Bullet>,
    pub rng: Pcg32,
    pub ids: IdCounters,
}

impl World {
    pub fn new(seed: u64) -> Self {
        Self {
            floor: 1,
            kills: 0,
            dungeon: Dungeon::generate(seed),
            players: IndexMap::new(),
            bullets: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            ids: IdCounters::default(),
        }
    }

    /// Begin a fresh run on floor 1 with a dungeon built from `seed`
    pub fn start_run(&mut self, seed: u64) {
        self.floor = 1;
        self.kills = 0;
        self.bullets.clear();
        self.dungeon = Dungeon::generate(seed);

        for (i, player) in self.players.values_mut().enumerate() {
            let offset = START_OFFSETS.get(i).copied().unwrap_or(Vec2::ZERO);
            player.reset_for_run(room_center() + offset);
        }

        self.populate_room(RoomCoord::ORIGIN);
    }

    /// Fill a room with enemies the first time it is entered on this floor
    pub fn populate_room(&mut self, coord: RoomCoord) {
        let room = self.dungeon.room(coord);
        if !room.exists || room.spawned || room.kind == RoomKind::Shop {
            return;
        }

        let mut enemies = Vec::new();
        if room.kind == RoomKind::Boss {
            let pos = room_center() - Vec2::new(0.0, BOSS_SPAWN_OFFSET);
            enemies.push(self.make_enemy(EnemyKind::Boss, pos));
        } else {
            let difficulty = self.floor as usize + (coord.r + coord.c) / 2;
            let count =
                (2 + self.rng.random_range(0..3) + difficulty / 2).min(MAX_ROOM_ENEMIES);
            let pool_len = (2 + difficulty).min(EnemyKind::POOL.len());
            for _ in 0..count {
                let kind = EnemyKind::POOL[self.rng.random_range(0..pool_len)];
                let pos = self.spawn_point();
                enemies.push(self.make_enemy(kind, pos));
            }
        }

        log::debug!(
            "Populated room {} on floor {} with {} enemies",
            coord.key(),
            self.floor,
            enemies.len()
        );
        let room = self.dungeon.room_mut(coord);
        room.spawned = true;
        room.enemies = enemies;
    }

    fn make_enemy(&mut self, kind: EnemyKind, pos: Vec2) -> Enemy {
        let interval = kind.spec().shoot_interval;
        let shoot_timer = self.rng.random_range(0..if interval > 0 { interval } else { 60 });
        let phase = self.rng.random::<f32>() * TAU;
        Enemy::new(self.ids.enemy(), kind, pos, self.floor, phase, shoot_timer)
    }

    /// Random interior point, preferring ones away from the centre
    fn spawn_point(&mut self) -> Vec2 {
        let min = Vec2::new((ROOM_X + 2) as f32 * TILE, (ROOM_Y + 2) as f32 * TILE);
        let span = Vec2::new((ROOM_W - 4) as f32 * TILE, (ROOM_H - 4) as f32 * TILE);
        let mut pos = min;
        for _ in 0..SPAWN_TRIES {
            pos = min + span * Vec2::new(self.rng.random::<f32>(), self.rng.random::<f32>());
            if pos.distance(room_center()) >= SPAWN_CLEARANCE {
                break;
            }
        }
        pos
    }

    /// Rooms holding at least one living player, in grid order
    pub fn occupied_rooms(&self) -> Vec<RoomCoord> {
        let mut rooms: Vec<RoomCoord> = self
            .players
            .values()
            .filter(|p| p.alive)
            .map(|p| p.room)
            .collect();
        rooms.sort();
        rooms.dedup();
        rooms
    }

    pub fn any_alive(&self) -> bool {
        self.players.values().any(|p| p.alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ConnectionId;

    fn world_with_players(n: u32) -> World {
        let mut world = World::new(1234);
        for id in 1..=n {
            world
                .players
                .insert(id, Player::new(id, ConnectionId(id as u64), id == 1));
        }
        world
    }

    #[test]
    fn test_start_run_populates_origin_only() {
        let mut world = world_with_players(2);
        world.start_run(1234);
        let origin = world.dungeon.room(RoomCoord::ORIGIN);
        assert!(origin.spawned);
        assert!(!origin.enemies.is_empty());
        assert!(origin.enemies.len() <= MAX_ROOM_ENEMIES);
        let boss = world.dungeon.room(RoomCoord::BOSS);
        assert!(!boss.spawned);
        assert!(boss.enemies.is_empty());
    }

    #[test]
    fn test_start_positions_distinct() {
        let mut world = world_with_players(4);
        world.start_run(1);
        let positions: Vec<Vec2> = world.players.values().map(|p| p.pos).collect();
        for (i, a) in positions.iter().enumerate() {
            for b in &positions[i + 1..] {
                assert!(a.distance(*b) > 1.0);
            }
        }
    }

    #[test]
    fn test_boss_room_spawns_single_scaled_boss() {
        let mut world = world_with_players(1);
        world.start_run(55);
        world.floor = 2;
        world.populate_room(RoomCoord::BOSS);
        let boss_room = world.dungeon.room(RoomCoord::BOSS);
        assert_eq!(boss_room.enemies.len(), 1);
        let boss = &boss_room.enemies[0];
        assert_eq!(boss.kind, EnemyKind::Boss);
        assert!((boss.hp - 600.0).abs() < 0.001);

        // Second entry on the same floor does nothing
        world.populate_room(RoomCoord::BOSS);
        assert_eq!(world.dungeon.room(RoomCoord::BOSS).enemies.len(), 1);
    }

    #[test]
    fn test_occupied_rooms_skips_dead() {
        let mut world = world_with_players(2);
        world.start_run(9);
        world.players[1].room = RoomCoord::new(1, 0);
        assert_eq!(world.occupied_rooms().len(), 2);
        world.players[1].alive = false;
        assert_eq!(world.occupied_rooms(), vec![RoomCoord::ORIGIN]);
    }
}
