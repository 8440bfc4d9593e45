//! Seeded dungeon layout
//!
//! A floor is a fixed grid of room cells. Generation is a pure function of the
//! seed: a forward-biased walk from the origin to the boss corner guarantees a
//! connected spine, then extra rooms are grown off existing ones.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::{Enemy, Pickup};
use crate::consts::{MAP_COLS, MAP_ROWS};

/// Growth phase gives up after this many attach attempts
pub const GROWTH_ATTEMPTS: u32 = 200;
/// Minimum room count the growth phase aims for (plus 0..=4 from the seed)
pub const BASE_ROOM_TARGET: usize = 8;
/// After this many walk steps the walk only moves forward
const MAX_WALK_STEPS: u32 = 256;

const SHOP_CHANCE: f32 = 0.1;
const CHEST_CHANCE: f32 = 0.25;

/// Grid position of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomCoord {
    pub r: usize,
    pub c: usize,
}

impl RoomCoord {
    pub const ORIGIN: RoomCoord = RoomCoord { r: 0, c: 0 };
    pub const BOSS: RoomCoord = RoomCoord {
        r: MAP_ROWS - 1,
        c: MAP_COLS - 1,
    };

    pub fn new(r: usize, c: usize) -> Self {
        Self { r, c }
    }

    /// Adjacent cell in `dir`, if it is on the grid
    pub fn step(self, dir: Direction) -> Option<RoomCoord> {
        let (dr, dc) = dir.delta();
        let r = self.r as isize + dr;
        let c = self.c as isize + dc;
        if r < 0 || c < 0 || r >= MAP_ROWS as isize || c >= MAP_COLS as isize {
            return None;
        }
        Some(RoomCoord::new(r as usize, c as usize))
    }

    /// "r,c" key used by clients
    pub fn key(self) -> String {
        format!("{},{}", self.r, self.c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// (row, col) delta
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    #[default]
    Normal,
    Shop,
    Boss,
}

/// One grid cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Room {
    pub exists: bool,
    pub cleared: bool,
    pub chest: bool,
    /// Enemies have been populated (once per floor)
    pub spawned: bool,
    pub kind: RoomKind,
    pub enemies: Vec<Enemy>,
    pub pickups: Vec<Pickup>,
}

impl Room {
    /// Doors open once the room is cleared, and always in shops
    pub fn doors_open(&self) -> bool {
        self.cleared || self.kind == RoomKind::Shop
    }
}

/// A full floor layout
#[derive(Debug, Clone, PartialEq)]
pub struct Dungeon {
    pub seed: u64,
    rooms: Vec<Room>,
}

impl Dungeon {
    /// Generate a floor from `seed`; identical seeds give identical layouts
    pub fn generate(seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut dungeon = Self {
            seed,
            rooms: vec![Room::default(); MAP_ROWS * MAP_COLS],
        };

        dungeon.carve_spine(&mut rng);
        dungeon.grow(&mut rng);

        dungeon.room_mut(RoomCoord::ORIGIN).kind = RoomKind::Normal;
        dungeon.room_mut(RoomCoord::BOSS).kind = RoomKind::Boss;

        for coord in Self::coords() {
            if coord == RoomCoord::ORIGIN || coord == RoomCoord::BOSS || !dungeon.exists(coord) {
                continue;
            }
            let shop = rng.random::<f32>() < SHOP_CHANCE;
            let chest = rng.random::<f32>() < CHEST_CHANCE;
            let room = dungeon.room_mut(coord);
            room.kind = if shop { RoomKind::Shop } else { RoomKind::Normal };
            room.chest = chest;
        }

        log::debug!(
            "Generated dungeon seed={} rooms={}",
            seed,
            dungeon.room_count()
        );
        dungeon
    }

    /// Forward-biased random walk from origin to the boss corner
    fn carve_spine(&mut self, rng: &mut Pcg32) {
        let mut at = RoomCoord::ORIGIN;
        self.room_mut(at).exists = true;

        let mut steps = 0u32;
        let mut options: Vec<Direction> = Vec::with_capacity(6);
        while at != RoomCoord::BOSS {
            options.clear();
            if at.r < MAP_ROWS - 1 {
                options.extend([Direction::Down, Direction::Down]);
            }
            if at.c < MAP_COLS - 1 {
                options.extend([Direction::Right, Direction::Right]);
            }
            if steps < MAX_WALK_STEPS {
                if at.r > 0 {
                    options.push(Direction::Up);
                }
                if at.c > 0 {
                    options.push(Direction::Left);
                }
            }
            let dir = options[rng.random_range(0..options.len())];
            if let Some(next) = at.step(dir) {
                at = next;
                self.room_mut(at).exists = true;
            }
            steps += 1;
        }
    }

    /// Attach extra rooms until the seed-derived target is met or attempts run out
    fn grow(&mut self, rng: &mut Pcg32) {
        let target = BASE_ROOM_TARGET + rng.random_range(0..5);
        for _ in 0..GROWTH_ATTEMPTS {
            let existing: Vec<RoomCoord> =
                Self::coords().filter(|&c| self.exists(c)).collect();
            if existing.len() >= target {
                break;
            }
            let from = existing[rng.random_range(0..existing.len())];
            let mut dirs = Direction::ALL;
            dirs.shuffle(rng);
            if let Some(free) = dirs
                .iter()
                .filter_map(|&d| from.step(d))
                .find(|&n| !self.exists(n))
            {
                self.room_mut(free).exists = true;
            }
        }
    }

    /// All grid coordinates in row-major order
    pub fn coords() -> impl Iterator<Item = RoomCoord> {
        (0..MAP_ROWS).flat_map(|r| (0..MAP_COLS).map(move |c| RoomCoord::new(r, c)))
    }

    fn index(coord: RoomCoord) -> usize {
        coord.r * MAP_COLS + coord.c
    }

    pub fn room(&self, coord: RoomCoord) -> &Room {
        &self.rooms[Self::index(coord)]
    }

    pub fn room_mut(&mut self, coord: RoomCoord) -> &mut Room {
        &mut self.rooms[Self::index(coord)]
    }

    pub fn exists(&self, coord: RoomCoord) -> bool {
        self.room(coord).exists
    }

    pub fn room_count(&self) -> usize {
        self.rooms.iter().filter(|r| r.exists).count()
    }

    /// Directions with a door out of `coord` right now
    pub fn open_doors(&self, coord: RoomCoord) -> Vec<Direction> {
        if !self.room(coord).doors_open() {
            return Vec::new();
        }
        Direction::ALL
            .into_iter()
            .filter(|&d| coord.step(d).is_some_and(|n| self.exists(n)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    fn reachable(d: &Dungeon) -> usize {
        let mut seen = vec![false; MAP_ROWS * MAP_COLS];
        let mut queue = VecDeque::from([RoomCoord::ORIGIN]);
        seen[Dungeon::index(RoomCoord::ORIGIN)] = true;
        let mut count = 0;
        while let Some(at) = queue.pop_front() {
            count += 1;
            for dir in Direction::ALL {
                if let Some(n) = at.step(dir) {
                    if d.exists(n) && !seen[Dungeon::index(n)] {
                        seen[Dungeon::index(n)] = true;
                        queue.push_back(n);
                    }
                }
            }
        }
        count
    }

    #[test]
    fn test_determinism() {
        let a = Dungeon::generate(424242);
        let b = Dungeon::generate(424242);
        assert_eq!(a, b);
    }

    #[test]
    fn test_origin_and_boss() {
        let d = Dungeon::generate(7);
        assert!(d.exists(RoomCoord::ORIGIN));
        assert_eq!(d.room(RoomCoord::ORIGIN).kind, RoomKind::Normal);
        assert_eq!(d.room(RoomCoord::BOSS).kind, RoomKind::Boss);
        assert!(!d.room(RoomCoord::BOSS).chest);
    }

    #[test]
    fn test_doors_need_clear_or_shop() {
        let mut d = Dungeon::generate(99);
        assert!(d.open_doors(RoomCoord::ORIGIN).is_empty());
        d.room_mut(RoomCoord::ORIGIN).cleared = true;
        let doors = d.open_doors(RoomCoord::ORIGIN);
        assert!(!doors.is_empty());
        // Origin sits in the corner; only down/right can lead anywhere
        assert!(doors.iter().all(|&dir| matches!(dir, Direction::Down | Direction::Right)));
    }

    #[test]
    fn test_step_off_grid() {
        assert_eq!(RoomCoord::ORIGIN.step(Direction::Up), None);
        assert_eq!(RoomCoord::BOSS.step(Direction::Right), None);
        assert_eq!(
            RoomCoord::ORIGIN.step(Direction::Down),
            Some(RoomCoord::new(1, 0))
        );
    }

    proptest! {
        #[test]
        fn prop_layout_connected_with_single_boss(seed in any::<u64>()) {
            let d = Dungeon::generate(seed);
            prop_assert_eq!(reachable(&d), d.room_count());
            let bosses: Vec<_> = Dungeon::coords()
                .filter(|&c| d.exists(c) && d.room(c).kind == RoomKind::Boss)
                .collect();
            prop_assert_eq!(bosses, vec![RoomCoord::BOSS]);
            prop_assert!(d.room_count() <= MAP_ROWS * MAP_COLS);
        }

        #[test]
        fn prop_same_seed_same_layout(seed in any::<u64>()) {
            prop_assert_eq!(Dungeon::generate(seed), Dungeon::generate(seed));
        }
    }
}
