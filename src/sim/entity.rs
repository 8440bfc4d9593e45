//! Players, enemies, bullets and pickups

use glam::Vec2;

use super::dungeon::RoomCoord;
use crate::catalog::{EnemyKind, EnemySpec, ProjectileKind, WeaponKind, WeaponSpec};
use crate::protocol::ConnectionId;
use crate::room_center;

pub type PlayerId = u32;
pub type EntityId = u32;

/// Weapon slots per player
pub const WEAPON_SLOTS: usize = 3;
pub const PLAYER_SIZE: f32 = 22.0;
pub const PLAYER_BASE_HP: i32 = 100;
pub const PLAYER_HP_CAP: i32 = 200;
pub const PLAYER_SPEED: f32 = 3.0;
/// Ticks of immunity after taking a hit
pub const HIT_INVINCIBILITY_TICKS: u32 = 60;

const BODY_COLORS: [&str; 4] = ["#3498db", "#2ecc71", "#e74c3c", "#f39c12"];
const CAPE_COLORS: [&str; 4] = ["#8e44ad", "#27ae60", "#c0392b", "#e67e22"];

/// A carried weapon: catalog key plus its own ammo counter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weapon {
    pub kind: WeaponKind,
    /// `None` means unlimited
    pub ammo: Option<u32>,
}

impl Weapon {
    /// Fresh weapon with a full magazine
    pub fn new(kind: WeaponKind) -> Self {
        Self {
            kind,
            ammo: kind.spec().ammo,
        }
    }

    pub fn spec(&self) -> &'static WeaponSpec {
        self.kind.spec()
    }

    pub fn is_starter(&self) -> bool {
        self.kind == WeaponKind::STARTER
    }

    pub fn can_fire(&self) -> bool {
        self.ammo.is_none_or(|n| n > 0)
    }

    /// Spend one trigger pull
    pub fn consume(&mut self) {
        if let Some(n) = self.ammo.as_mut() {
            *n = n.saturating_sub(1);
        }
    }

    /// Add `fraction` of capacity (rounded up), never past capacity
    pub fn restock(&mut self, fraction: f32) {
        let Some(max) = self.spec().ammo else {
            return;
        };
        if let Some(n) = self.ammo.as_mut() {
            let add = (max as f32 * fraction).ceil() as u32;
            *n = (*n + add).min(max);
        }
    }
}

/// Latest intent received from a client, consumed by the tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
    /// Each axis in [-1, 1]
    pub move_dir: Vec2,
    pub facing: f32,
    pub shooting: bool,
    pub switch_to: Option<usize>,
    /// One-shot: cleared once processed
    pub pickup: bool,
    /// One-shot: cleared once processed
    pub drop_weapon: bool,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub connection: ConnectionId,
    pub name: String,
    pub body_color: String,
    pub cape_color: String,
    pub is_host: bool,
    pub ready: bool,

    pub pos: Vec2,
    pub facing: f32,
    pub hp: i32,
    pub max_hp: i32,
    pub speed: f32,
    pub dmg_mult: f32,
    pub weapons: [Option<Weapon>; WEAPON_SLOTS],
    pub weapon_idx: usize,
    pub fire_cooldown: u32,
    pub invincible: u32,
    pub room: RoomCoord,
    pub alive: bool,
    pub input: PlayerInput,
}

impl Player {
    pub fn new(id: PlayerId, connection: ConnectionId, is_host: bool) -> Self {
        let palette = (id.saturating_sub(1)) as usize % BODY_COLORS.len();
        Self {
            id,
            connection,
            name: format!("P{id}"),
            body_color: BODY_COLORS[palette].to_string(),
            cape_color: CAPE_COLORS[palette].to_string(),
            is_host,
            ready: false,
            pos: room_center(),
            facing: 0.0,
            hp: PLAYER_BASE_HP,
            max_hp: PLAYER_BASE_HP,
            speed: PLAYER_SPEED,
            dmg_mult: 1.0,
            weapons: [Some(Weapon::new(WeaponKind::STARTER)), None, None],
            weapon_idx: 0,
            fire_cooldown: 0,
            invincible: 0,
            room: RoomCoord::ORIGIN,
            alive: true,
            input: PlayerInput::default(),
        }
    }

    /// Reset simulation state for a fresh run
    pub fn reset_for_run(&mut self, spawn: Vec2) {
        self.pos = spawn;
        self.facing = 0.0;
        self.max_hp = PLAYER_BASE_HP;
        self.hp = self.max_hp;
        self.alive = true;
        self.weapons = [Some(Weapon::new(WeaponKind::STARTER)), None, None];
        self.weapon_idx = 0;
        self.fire_cooldown = 0;
        self.invincible = 0;
        self.room = RoomCoord::ORIGIN;
        self.input = PlayerInput::default();
    }

    pub fn half_extents(&self) -> Vec2 {
        Vec2::splat(PLAYER_SIZE / 2.0)
    }

    pub fn active_weapon(&self) -> Option<&Weapon> {
        self.weapons[self.weapon_idx].as_ref()
    }

    /// Apply damage, clamp to [0, max]; returns true if this hit was fatal
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if !self.alive {
            return false;
        }
        self.hp = (self.hp - amount).clamp(0, self.max_hp);
        self.invincible = HIT_INVINCIBILITY_TICKS;
        if self.hp == 0 {
            self.alive = false;
            return true;
        }
        false
    }

    pub fn heal(&mut self, amount: i32) {
        if !self.alive {
            return;
        }
        self.hp = (self.hp + amount).clamp(0, self.max_hp);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub id: EntityId,
    pub kind: EnemyKind,
    pub hp: f32,
    pub max_hp: f32,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Behaviour phase angle (radians)
    pub phase: f32,
    /// Ticks until the next ranged attack
    pub shoot_timer: u32,
    /// Ticks of inaction left
    pub stunned: u32,
}

impl Enemy {
    /// New enemy with hp scaled for `floor` (+20% per floor past the first)
    pub fn new(id: EntityId, kind: EnemyKind, pos: Vec2, floor: u32, phase: f32, shoot_timer: u32) -> Self {
        let hp = kind.spec().hp * difficulty_scale(floor);
        Self {
            id,
            kind,
            hp,
            max_hp: hp,
            pos,
            vel: Vec2::ZERO,
            phase,
            shoot_timer,
            stunned: 0,
        }
    }

    pub fn spec(&self) -> &'static EnemySpec {
        self.kind.spec()
    }

    pub fn size(&self) -> f32 {
        self.spec().size
    }

    pub fn half_extents(&self) -> Vec2 {
        Vec2::splat(self.size())
    }

    /// Apply damage, clamped at zero; returns true if the enemy died
    pub fn take_damage(&mut self, amount: f32) -> bool {
        self.hp = (self.hp - amount).clamp(0.0, self.max_hp);
        self.hp <= 0.0
    }
}

/// Enemy hp multiplier for a floor
pub fn difficulty_scale(floor: u32) -> f32 {
    1.0 + floor.saturating_sub(1) as f32 * 0.2
}

/// Who fired a bullet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Player(PlayerId),
    Enemy,
}

#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub angle: f32,
    pub owner: Owner,
    pub damage: f32,
    pub explosive: bool,
    /// Ticks left before expiry
    pub life: u32,
    pub size: f32,
    pub projectile: ProjectileKind,
    pub color: &'static str,
    pub room: RoomCoord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickupKind {
    Health,
    Ammo,
    Weapon(Weapon),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pickup {
    pub id: EntityId,
    pub pos: Vec2,
    pub kind: PickupKind,
}

/// Per-session id allocators
#[derive(Debug, Clone)]
pub struct IdCounters {
    next_enemy: EntityId,
    next_bullet: EntityId,
    next_pickup: EntityId,
}

impl Default for IdCounters {
    fn default() -> Self {
        Self {
            next_enemy: 1,
            next_bullet: 1,
            next_pickup: 1,
        }
    }
}

impl IdCounters {
    pub fn enemy(&mut self) -> EntityId {
        let id = self.next_enemy;
        self.next_enemy += 1;
        id
    }

    pub fn bullet(&mut self) -> EntityId {
        let id = self.next_bullet;
        self.next_bullet += 1;
        id
    }

    pub fn pickup(&mut self) -> EntityId {
        let id = self.next_pickup;
        self.next_pickup += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_starter_never_runs_dry() {
        let mut w = Weapon::new(WeaponKind::Pistol);
        for _ in 0..1000 {
            w.consume();
        }
        assert!(w.can_fire());
    }

    #[test]
    fn test_restock_rounds_up_and_caps() {
        let mut w = Weapon::new(WeaponKind::Rocket);
        w.ammo = Some(0);
        w.restock(0.4);
        // ceil(8 * 0.4) = 4
        assert_eq!(w.ammo, Some(4));
        w.restock(0.4);
        w.restock(0.4);
        assert_eq!(w.ammo, Some(8));
    }

    #[test]
    fn test_player_hit_clamps_at_zero() {
        let mut p = Player::new(1, ConnectionId(1), true);
        p.hp = 10;
        assert!(p.take_damage(15));
        assert_eq!(p.hp, 0);
        assert!(!p.alive);
        // Already dead: further hits change nothing
        assert!(!p.take_damage(15));
        assert_eq!(p.hp, 0);
    }

    #[test]
    fn test_enemy_hp_scales_with_floor() {
        let e = Enemy::new(1, EnemyKind::Boss, Vec2::ZERO, 3, 0.0, 0);
        assert!((e.max_hp - 700.0).abs() < 0.001);
    }

    proptest! {
        #[test]
        fn prop_player_health_stays_in_range(
            deltas in prop::collection::vec(-60i32..60, 1..100),
        ) {
            let mut p = Player::new(1, ConnectionId(1), true);
            for d in deltas {
                if d < 0 {
                    p.take_damage(-d);
                } else {
                    p.heal(d);
                }
                prop_assert!(p.hp >= 0 && p.hp <= p.max_hp);
                prop_assert_eq!(p.hp == 0, !p.alive);
            }
        }

        #[test]
        fn prop_enemy_health_stays_in_range(
            hits in prop::collection::vec(0.0f32..200.0, 1..20),
        ) {
            let mut e = Enemy::new(1, EnemyKind::Orc, Vec2::ZERO, 1, 0.0, 0);
            for h in hits {
                let dead = e.take_damage(h);
                prop_assert!(e.hp >= 0.0 && e.hp <= e.max_hp);
                prop_assert_eq!(dead, e.hp <= 0.0);
            }
        }
    }
}
