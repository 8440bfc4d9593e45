//! Client-facing views of the world
//!
//! Plain serializable records built fresh each tick. Field names follow the
//! browser client's camelCase JSON.

use std::collections::BTreeMap;

use serde::Serialize;

use super::dungeon::{Dungeon, RoomCoord, RoomKind};
use super::entity::{Bullet, Enemy, Owner, Pickup, PickupKind, Player, PlayerId, Weapon};
use super::state::World;
use crate::catalog::{Behavior, EnemyKind, ProjectileKind};
use crate::consts::{MAP_COLS, MAP_ROWS};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponView {
    pub name: &'static str,
    pub color: &'static str,
    /// `None` (JSON null) for unlimited
    pub ammo: Option<u32>,
    pub bullet: ProjectileKind,
}

impl From<&Weapon> for WeaponView {
    fn from(w: &Weapon) -> Self {
        let spec = w.spec();
        Self {
            name: spec.name,
            color: spec.color,
            ammo: w.ammo,
            bullet: spec.projectile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub facing: f32,
    pub hp: i32,
    pub max_hp: i32,
    pub alive: bool,
    pub body_color: String,
    pub cape_color: String,
    pub invincible: bool,
    pub current_room: RoomCoord,
    pub weapon_idx: usize,
    pub weapons: Vec<Option<WeaponView>>,
}

impl From<&Player> for PlayerView {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            x: p.pos.x,
            y: p.pos.y,
            facing: p.facing,
            hp: p.hp,
            max_hp: p.max_hp,
            alive: p.alive,
            body_color: p.body_color.clone(),
            cape_color: p.cape_color.clone(),
            invincible: p.invincible > 0,
            current_room: p.room,
            weapon_idx: p.weapon_idx,
            weapons: p.weapons.iter().map(|w| w.as_ref().map(WeaponView::from)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletView {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    #[serde(rename = "type")]
    pub projectile: ProjectileKind,
    pub color: &'static str,
    pub size: f32,
    pub from_enemy: bool,
    /// "r,c"
    pub room: String,
}

impl From<&Bullet> for BulletView {
    fn from(b: &Bullet) -> Self {
        Self {
            id: b.id,
            x: b.pos.x,
            y: b.pos.y,
            angle: b.angle,
            projectile: b.projectile,
            color: b.color,
            size: b.size,
            from_enemy: b.owner == Owner::Enemy,
            room: b.room.key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyView {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: EnemyKind,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub size: f32,
    pub color: &'static str,
    pub ai: Behavior,
}

impl From<&Enemy> for EnemyView {
    fn from(e: &Enemy) -> Self {
        let spec = e.spec();
        Self {
            id: e.id,
            kind: e.kind,
            x: e.pos.x,
            y: e.pos.y,
            hp: e.hp,
            max_hp: e.max_hp,
            size: spec.size,
            color: spec.color,
            ai: spec.behavior,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PickupType {
    Health,
    Ammo,
    Weapon,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupView {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "type")]
    pub kind: PickupType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weapon: Option<WeaponView>,
}

impl From<&Pickup> for PickupView {
    fn from(p: &Pickup) -> Self {
        let (kind, weapon) = match &p.kind {
            PickupKind::Health => (PickupType::Health, None),
            PickupKind::Ammo => (PickupType::Ammo, None),
            PickupKind::Weapon(w) => (PickupType::Weapon, Some(WeaponView::from(w))),
        };
        Self {
            id: p.id,
            x: p.pos.x,
            y: p.pos.y,
            kind,
            weapon,
        }
    }
}

/// Live contents of an occupied room
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomView {
    pub enemies: Vec<EnemyView>,
    pub pickups: Vec<PickupView>,
    pub cleared: bool,
}

/// Per-tick world state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub players: Vec<PlayerView>,
    pub bullets: Vec<BulletView>,
    /// Keyed "r,c"; only rooms holding a living player
    pub rooms: BTreeMap<String, RoomView>,
    pub floor: u32,
    pub kills: u32,
}

/// One cell of the full layout sent at game start and on each new floor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellView {
    pub exists: bool,
    pub cleared: bool,
    pub chest: bool,
    #[serde(rename = "type")]
    pub kind: RoomKind,
    pub spawned: bool,
    pub enemies: Vec<EnemyView>,
    pub pickups: Vec<PickupView>,
}

/// Row-major grid of cells
pub type DungeonView = Vec<Vec<CellView>>;

pub fn build_snapshot(world: &World) -> StateSnapshot {
    let rooms = world
        .occupied_rooms()
        .into_iter()
        .map(|coord| {
            let room = world.dungeon.room(coord);
            let view = RoomView {
                enemies: room.enemies.iter().map(EnemyView::from).collect(),
                pickups: room.pickups.iter().map(PickupView::from).collect(),
                cleared: room.cleared,
            };
            (coord.key(), view)
        })
        .collect();

    StateSnapshot {
        players: world.players.values().map(PlayerView::from).collect(),
        bullets: world.bullets.iter().map(BulletView::from).collect(),
        rooms,
        floor: world.floor,
        kills: world.kills,
    }
}

pub fn dungeon_view(dungeon: &Dungeon) -> DungeonView {
    (0..MAP_ROWS)
        .map(|r| {
            (0..MAP_COLS)
                .map(|c| {
                    let room = dungeon.room(RoomCoord::new(r, c));
                    CellView {
                        exists: room.exists,
                        cleared: room.cleared,
                        chest: room.chest,
                        kind: room.kind,
                        spawned: room.spawned,
                        enemies: room.enemies.iter().map(EnemyView::from).collect(),
                        pickups: room.pickups.iter().map(PickupView::from).collect(),
                    }
                })
                .collect()
        })
        .collect()
}
