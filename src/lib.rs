//! Ghost Crawler - authoritative server core for a co-op dungeon crawler
//!
//! Core modules:
//! - `sim`: Deterministic simulation (dungeon, entities, AI, projectiles, loot)
//! - `catalog`: Immutable weapon and enemy tables shared with clients
//! - `protocol`: Inbound/outbound message vocabulary
//! - `session`: Lobby state machine and per-session tick resolution
//! - `server`: Session registry and message dispatch
//! - `driver`: Fixed-rate tick driver per session
//! - `settings`: Server tunables

pub mod catalog;
pub mod driver;
pub mod error;
pub mod protocol;
pub mod server;
pub mod session;
pub mod settings;
pub mod sim;

pub use error::{JoinError, ProtocolError};
pub use server::Server;
pub use settings::Settings;

use glam::Vec2;

/// Constants that must match the client
pub mod consts {
    /// Simulation rate
    pub const TICK_RATE_HZ: u32 = 60;

    /// Playfield dimensions (pixels)
    pub const FIELD_W: f32 = 800.0;
    pub const FIELD_H: f32 = 600.0;
    pub const TILE: f32 = 32.0;

    /// Room placement in tiles: origin and size, including the wall ring
    pub const ROOM_X: i32 = 2;
    pub const ROOM_Y: i32 = 2;
    pub const ROOM_W: i32 = 21;
    pub const ROOM_H: i32 = 14;

    /// Dungeon grid size (rooms)
    pub const MAP_ROWS: usize = 4;
    pub const MAP_COLS: usize = 5;

    /// Most players a session will accept
    pub const MAX_PLAYERS: usize = 4;
}

/// Centre of the room in world coordinates
#[inline]
pub fn room_center() -> Vec2 {
    Vec2::new(consts::FIELD_W / 2.0, consts::FIELD_H / 2.0)
}

/// Unit vector for an angle in radians
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}
