//! Effects produced during a tick
//!
//! The simulation steps push these in order; the session resolves them in a
//! single pass after the world has advanced.

use glam::Vec2;

use super::dungeon::{Direction, RoomCoord};
use super::entity::{EntityId, Pickup, PlayerId};
use crate::catalog::EnemyKind;

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Enemy reached 0 hp and has already been removed from its room
    EnemyKilled {
        enemy_id: EntityId,
        kind: EnemyKind,
        pos: Vec2,
        room: RoomCoord,
    },
    /// Damage to apply to a player
    PlayerHit { player_id: PlayerId, damage: i32 },
    /// Floating feedback text
    SpawnText {
        pos: Vec2,
        text: String,
        color: String,
    },
    PickupTaken {
        pickup_id: EntityId,
        player_id: PlayerId,
        room: RoomCoord,
    },
    WeaponDropped { pickup: Pickup, room: RoomCoord },
    /// Emitted once per room per floor
    RoomCleared {
        room: RoomCoord,
        chest: bool,
        boss: bool,
    },
    Explosion { pos: Vec2, room: RoomCoord },
    PlayerEnteredRoom {
        player_id: PlayerId,
        room: RoomCoord,
        from: Direction,
        pos: Vec2,
    },
}
