//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must stay free of I/O:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (players by join order, rooms by grid order)
//! - Effects are returned as events, never sent directly

pub mod ai;
pub mod collision;
pub mod dungeon;
pub mod entity;
pub mod event;
pub mod input;
pub mod loot;
pub mod projectile;
pub mod snapshot;
pub mod state;
pub mod tick;

pub use dungeon::{Direction, Dungeon, Room, RoomCoord, RoomKind};
pub use entity::{Bullet, Enemy, Owner, Pickup, PickupKind, Player, PlayerId, PlayerInput, Weapon};
pub use event::GameEvent;
pub use snapshot::{DungeonView, StateSnapshot, build_snapshot, dungeon_view};
pub use state::World;
pub use tick::step;
