//! Weapon and enemy catalogs
//!
//! Immutable tables shared with clients. Entities store only a kind key plus
//! their own mutable counters (ammo, hp) and look everything else up here.

use serde::{Deserialize, Serialize};

/// Projectile shape; rockets explode on impact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectileKind {
    Circle,
    Laser,
    Rocket,
    Arrow,
}

impl ProjectileKind {
    pub fn explosive(self) -> bool {
        self == ProjectileKind::Rocket
    }
}

/// Static weapon definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponSpec {
    pub name: &'static str,
    pub damage: f32,
    pub speed: f32,
    /// Ticks between trigger pulls
    pub rate: u32,
    /// Magazine capacity; `None` for unlimited
    pub ammo: Option<u32>,
    /// Max angular deviation per shot (radians, either side)
    pub spread: f32,
    /// Bullets per trigger pull
    pub burst: u32,
    pub color: &'static str,
    pub projectile: ProjectileKind,
    pub size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeaponKind {
    Pistol,
    Shotgun,
    Smg,
    Laser,
    Rocket,
    Crossbow,
    DualGuns,
}

impl WeaponKind {
    pub const ALL: [WeaponKind; 7] = [
        WeaponKind::Pistol,
        WeaponKind::Shotgun,
        WeaponKind::Smg,
        WeaponKind::Laser,
        WeaponKind::Rocket,
        WeaponKind::Crossbow,
        WeaponKind::DualGuns,
    ];

    /// Everything that can drop as loot (the starting pistol never does)
    pub const LOOT: [WeaponKind; 6] = [
        WeaponKind::Shotgun,
        WeaponKind::Smg,
        WeaponKind::Laser,
        WeaponKind::Rocket,
        WeaponKind::Crossbow,
        WeaponKind::DualGuns,
    ];

    /// The weapon every player starts with
    pub const STARTER: WeaponKind = WeaponKind::Pistol;

    pub fn spec(self) -> &'static WeaponSpec {
        match self {
            WeaponKind::Pistol => &PISTOL,
            WeaponKind::Shotgun => &SHOTGUN,
            WeaponKind::Smg => &SMG,
            WeaponKind::Laser => &LASER,
            WeaponKind::Rocket => &ROCKET,
            WeaponKind::Crossbow => &CROSSBOW,
            WeaponKind::DualGuns => &DUAL_GUNS,
        }
    }
}

const PISTOL: WeaponSpec = WeaponSpec {
    name: "PISTOL",
    damage: 15.0,
    speed: 9.0,
    rate: 18,
    ammo: None,
    spread: 0.06,
    burst: 1,
    color: "#f39c12",
    projectile: ProjectileKind::Circle,
    size: 4.0,
};

const SHOTGUN: WeaponSpec = WeaponSpec {
    name: "SHOTGUN",
    damage: 20.0,
    speed: 7.0,
    rate: 50,
    ammo: Some(24),
    spread: 0.25,
    burst: 5,
    color: "#e74c3c",
    projectile: ProjectileKind::Circle,
    size: 5.0,
};

const SMG: WeaponSpec = WeaponSpec {
    name: "SMG",
    damage: 8.0,
    speed: 11.0,
    rate: 6,
    ammo: Some(60),
    spread: 0.12,
    burst: 1,
    color: "#3498db",
    projectile: ProjectileKind::Circle,
    size: 3.0,
};

const LASER: WeaponSpec = WeaponSpec {
    name: "LASER",
    damage: 5.0,
    speed: 14.0,
    rate: 3,
    ammo: Some(40),
    spread: 0.0,
    burst: 1,
    color: "#00ff88",
    projectile: ProjectileKind::Laser,
    size: 3.0,
};

const ROCKET: WeaponSpec = WeaponSpec {
    name: "ROCKET",
    damage: 60.0,
    speed: 5.0,
    rate: 80,
    ammo: Some(8),
    spread: 0.03,
    burst: 1,
    color: "#ff6b35",
    projectile: ProjectileKind::Rocket,
    size: 8.0,
};

const CROSSBOW: WeaponSpec = WeaponSpec {
    name: "CROSSBOW",
    damage: 40.0,
    speed: 12.0,
    rate: 40,
    ammo: Some(15),
    spread: 0.0,
    burst: 1,
    color: "#9b59b6",
    projectile: ProjectileKind::Arrow,
    size: 6.0,
};

const DUAL_GUNS: WeaponSpec = WeaponSpec {
    name: "DUAL GUNS",
    damage: 12.0,
    speed: 10.0,
    rate: 10,
    ammo: Some(80),
    spread: 0.1,
    burst: 2,
    color: "#f1c40f",
    projectile: ProjectileKind::Circle,
    size: 4.0,
};

/// Movement/attack pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Behavior {
    Chase,
    Strafe,
    Orbit,
    Zigzag,
    Boss,
}

/// Static enemy definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemySpec {
    pub hp: f32,
    pub speed: f32,
    /// Melee contact damage
    pub damage: i32,
    /// Collision radius
    pub size: f32,
    pub color: &'static str,
    pub xp: u32,
    pub behavior: Behavior,
    /// Ticks between ranged attacks (0 = melee only)
    pub shoot_interval: u32,
    pub bullet_damage: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnemyKind {
    Goblin,
    Orc,
    Skeleton,
    Wizard,
    Bat,
    Slime,
    Boss,
}

impl EnemyKind {
    /// Regular spawn pool, ordered by when they unlock with difficulty
    pub const POOL: [EnemyKind; 6] = [
        EnemyKind::Goblin,
        EnemyKind::Orc,
        EnemyKind::Skeleton,
        EnemyKind::Wizard,
        EnemyKind::Bat,
        EnemyKind::Slime,
    ];

    pub fn spec(self) -> &'static EnemySpec {
        match self {
            EnemyKind::Goblin => &GOBLIN,
            EnemyKind::Orc => &ORC,
            EnemyKind::Skeleton => &SKELETON,
            EnemyKind::Wizard => &WIZARD,
            EnemyKind::Bat => &BAT,
            EnemyKind::Slime => &SLIME,
            EnemyKind::Boss => &BOSS,
        }
    }
}

const GOBLIN: EnemySpec = EnemySpec {
    hp: 30.0,
    speed: 1.4,
    damage: 10,
    size: 14.0,
    color: "#27ae60",
    xp: 10,
    behavior: Behavior::Chase,
    shoot_interval: 0,
    bullet_damage: 0,
};

const ORC: EnemySpec = EnemySpec {
    hp: 80.0,
    speed: 0.9,
    damage: 20,
    size: 20.0,
    color: "#16a085",
    xp: 25,
    behavior: Behavior::Chase,
    shoot_interval: 0,
    bullet_damage: 0,
};

const SKELETON: EnemySpec = EnemySpec {
    hp: 40.0,
    speed: 1.1,
    damage: 12,
    size: 15.0,
    color: "#bdc3c7",
    xp: 15,
    behavior: Behavior::Strafe,
    shoot_interval: 90,
    bullet_damage: 8,
};

const WIZARD: EnemySpec = EnemySpec {
    hp: 60.0,
    speed: 0.8,
    damage: 15,
    size: 16.0,
    color: "#8e44ad",
    xp: 30,
    behavior: Behavior::Orbit,
    shoot_interval: 60,
    bullet_damage: 12,
};

const BAT: EnemySpec = EnemySpec {
    hp: 20.0,
    speed: 2.2,
    damage: 8,
    size: 10.0,
    color: "#6c3483",
    xp: 8,
    behavior: Behavior::Zigzag,
    shoot_interval: 0,
    bullet_damage: 0,
};

const SLIME: EnemySpec = EnemySpec {
    hp: 50.0,
    speed: 0.7,
    damage: 15,
    size: 18.0,
    color: "#1abc9c",
    xp: 12,
    behavior: Behavior::Chase,
    shoot_interval: 150,
    bullet_damage: 10,
};

const BOSS: EnemySpec = EnemySpec {
    hp: 500.0,
    speed: 1.2,
    damage: 30,
    size: 38.0,
    color: "#c0392b",
    xp: 200,
    behavior: Behavior::Boss,
    shoot_interval: 30,
    bullet_damage: 20,
};
