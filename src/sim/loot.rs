//! Drops, chests and floor progression

use glam::Vec2;
use rand::Rng;

use super::dungeon::{Dungeon, RoomCoord};
use super::entity::{PLAYER_HP_CAP, Pickup, PickupKind, Weapon};
use super::state::World;
use crate::catalog::WeaponKind;
use crate::room_center;

/// Roll below this for a health drop
pub const HEALTH_DROP_BAND: f32 = 0.20;
/// Roll below this (and above the health band) for an ammo drop
pub const AMMO_DROP_BAND: f32 = 0.35;
/// Roll below this (and above the ammo band) for a weapon drop
pub const WEAPON_DROP_BAND: f32 = 0.45;
const DROP_JITTER: f32 = 10.0;
/// Chest health pack sits this far right of the centre
const CHEST_HEALTH_OFFSET: Vec2 = Vec2::new(30.0, 0.0);
/// Max health gained per floor
pub const FLOOR_HP_BONUS: i32 = 20;

/// Random weapon from the loot table
pub fn random_loot_weapon(rng: &mut impl Rng) -> Weapon {
    let kind = WeaponKind::LOOT[rng.random_range(0..WeaponKind::LOOT.len())];
    Weapon::new(kind)
}

/// Roll the kill drop table for an enemy that died at `pos`
///
/// Returns the pickup placed in the room, if any.
pub fn roll_enemy_drop(world: &mut World, room: RoomCoord, pos: Vec2) -> Option<Pickup> {
    let roll = world.rng.random::<f32>();
    let kind = if roll < HEALTH_DROP_BAND {
        PickupKind::Health
    } else if roll < AMMO_DROP_BAND {
        PickupKind::Ammo
    } else if roll < WEAPON_DROP_BAND {
        PickupKind::Weapon(random_loot_weapon(&mut world.rng))
    } else {
        return None;
    };

    // Weapons land exactly where the enemy fell; consumables scatter a little
    let at = match kind {
        PickupKind::Weapon(_) => pos,
        _ => {
            let jx = world.rng.random_range(-DROP_JITTER..DROP_JITTER);
            let jy = world.rng.random_range(-DROP_JITTER..DROP_JITTER);
            pos + Vec2::new(jx, jy)
        }
    };

    let pickup = Pickup {
        id: world.ids.pickup(),
        pos: at,
        kind,
    };
    place(&mut world.dungeon, room, pickup.clone());
    Some(pickup)
}

/// Spawn chest loot in a freshly cleared room: one weapon and one health pack
pub fn open_chest(world: &mut World, room: RoomCoord) -> [Pickup; 2] {
    let weapon = Pickup {
        id: world.ids.pickup(),
        pos: room_center(),
        kind: PickupKind::Weapon(random_loot_weapon(&mut world.rng)),
    };
    let health = Pickup {
        id: world.ids.pickup(),
        pos: room_center() + CHEST_HEALTH_OFFSET,
        kind: PickupKind::Health,
    };
    place(&mut world.dungeon, room, weapon.clone());
    place(&mut world.dungeon, room, health.clone());
    [weapon, health]
}

pub(crate) fn place(dungeon: &mut Dungeon, room: RoomCoord, pickup: Pickup) {
    dungeon.room_mut(room).pickups.push(pickup);
}

/// Move everyone to a freshly generated floor
///
/// All players are revived at the origin centre with a higher max health and
/// full hp. Bullets do not carry over.
pub fn advance_floor(world: &mut World, seed: u64) {
    world.floor += 1;
    world.dungeon = Dungeon::generate(seed);
    world.bullets.clear();

    for player in world.players.values_mut() {
        player.pos = room_center();
        player.room = RoomCoord::ORIGIN;
        player.max_hp = (player.max_hp + FLOOR_HP_BONUS).min(PLAYER_HP_CAP);
        player.hp = player.max_hp;
        player.alive = true;
        player.invincible = 0;
    }

    world.populate_room(RoomCoord::ORIGIN);
    log::info!("Advanced to floor {} (seed {})", world.floor, seed);
}
