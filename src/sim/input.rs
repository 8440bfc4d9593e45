//! Applying buffered player intent
//!
//! Runs once per tick for each living player, in join order: movement,
//! weapon switch, firing, drop, pickup, then the door check.

use glam::Vec2;
use rand::Rng;

use super::collision::move_entity;
use super::dungeon::Direction;
use super::entity::{
    Bullet, IdCounters, Owner, Pickup, PickupKind, Player, PlayerId, WEAPON_SLOTS,
};
use super::event::GameEvent;
use super::loot::place;
use super::state::World;
use crate::consts::*;
use crate::heading;

/// Scale applied to each axis when moving diagonally
const DIAGONAL: f32 = 0.707;
/// Cooldown charged for changing weapons
pub const SWITCH_COOLDOWN: u32 = 10;
/// Bullets leave the barrel this far in front of the player
const MUZZLE_OFFSET: f32 = 20.0;
/// Max sideways jitter for follow-up shots in a burst
const BURST_LATERAL: f32 = 8.0;
pub const PLAYER_BULLET_LIFE: u32 = 80;
/// Dropped and swapped weapons land this far in front of the player
const DROP_DISTANCE: f32 = 36.0;
pub const PICKUP_RANGE: f32 = 50.0;
pub const HEAL_AMOUNT: i32 = 15;
/// Fraction of capacity restored by an ammo pickup
pub const AMMO_RESTOCK: f32 = 0.4;
/// Door trigger radius
pub const DOOR_RADIUS: f32 = 30.0;

/// Where the door on the `dir` side of a room sits
pub fn door_position(dir: Direction) -> Vec2 {
    match dir {
        Direction::Up => Vec2::new(FIELD_W / 2.0, TILE * ROOM_Y as f32 + 16.0),
        Direction::Down => Vec2::new(FIELD_W / 2.0, TILE * (ROOM_Y + ROOM_H) as f32 - 16.0),
        Direction::Left => Vec2::new(TILE * ROOM_X as f32 + 16.0, FIELD_H / 2.0),
        Direction::Right => Vec2::new(TILE * (ROOM_X + ROOM_W) as f32 - 16.0, FIELD_H / 2.0),
    }
}

/// Where a player lands after walking through a door heading `dir`
///
/// Two tiles inside the wall opposite the one they came through.
pub fn entry_position(dir: Direction) -> Vec2 {
    match dir {
        Direction::Up => Vec2::new(FIELD_W / 2.0, ((ROOM_Y + ROOM_H - 2) as f32) * TILE - 24.0),
        Direction::Down => Vec2::new(FIELD_W / 2.0, ((ROOM_Y + 2) as f32) * TILE + 24.0),
        Direction::Left => Vec2::new(((ROOM_X + ROOM_W - 2) as f32) * TILE - 24.0, FIELD_H / 2.0),
        Direction::Right => Vec2::new(((ROOM_X + 2) as f32) * TILE + 24.0, FIELD_H / 2.0),
    }
}

/// Apply one tick of buffered input for `player_id`
pub fn apply_player_input(world: &mut World, player_id: PlayerId, events: &mut Vec<GameEvent>) {
    let World {
        players,
        bullets,
        dungeon,
        rng,
        ids,
        ..
    } = world;
    let Some(player) = players.get_mut(&player_id) else {
        return;
    };
    if !player.alive {
        return;
    }

    let input = player.input;
    let mut delta = input.move_dir * player.speed;
    if delta.x != 0.0 && delta.y != 0.0 {
        delta *= DIAGONAL;
    }
    let half = player.half_extents();
    move_entity(&mut player.pos, half, delta);
    player.facing = input.facing;

    player.invincible = player.invincible.saturating_sub(1);

    if let Some(slot) = player.input.switch_to.take() {
        if slot < WEAPON_SLOTS && slot != player.weapon_idx && player.weapons[slot].is_some() {
            player.weapon_idx = slot;
            player.fire_cooldown = SWITCH_COOLDOWN;
        }
    }

    player.fire_cooldown = player.fire_cooldown.saturating_sub(1);
    if input.shooting && player.fire_cooldown == 0 {
        fire(player, bullets, rng, ids);
    }

    if player.input.drop_weapon {
        player.input.drop_weapon = false;
        let slot = &mut player.weapons[player.weapon_idx];
        if let Some(weapon) = slot.filter(|w| !w.is_starter()) {
            *slot = None;
            let pickup = Pickup {
                id: ids.pickup(),
                pos: player.pos + heading(player.facing) * DROP_DISTANCE,
                kind: PickupKind::Weapon(weapon),
            };
            place(dungeon, player.room, pickup.clone());
            events.push(GameEvent::WeaponDropped {
                pickup,
                room: player.room,
            });
        }
    }

    if player.input.pickup {
        player.input.pickup = false;
        try_pickup(world, player_id, events);
    }

    if let Some(dir) = crossed_door(world, player_id) {
        enter_room(world, player_id, dir, events);
    }
}

fn fire(player: &mut Player, bullets: &mut Vec<Bullet>, rng: &mut impl Rng, ids: &mut IdCounters) {
    let owner = Owner::Player(player.id);
    let (facing, room) = (player.facing, player.room);
    let muzzle = player.pos + heading(facing) * MUZZLE_OFFSET;
    let dmg_mult = player.dmg_mult;

    let Some(weapon) = player.weapons[player.weapon_idx].as_mut() else {
        return;
    };
    if !weapon.can_fire() {
        return;
    }
    let spec = weapon.spec();
    let damage = (spec.damage * dmg_mult).round();

    for i in 0..spec.burst {
        let spread = (rng.random::<f32>() - 0.5) * spec.spread * 2.0;
        let lateral = if i == 0 {
            0.0
        } else {
            (rng.random::<f32>() - 0.5) * BURST_LATERAL
        };
        let angle = facing + spread;
        bullets.push(Bullet {
            id: ids.bullet(),
            pos: muzzle + Vec2::new(0.0, lateral),
            vel: heading(angle) * spec.speed,
            angle,
            owner,
            damage,
            explosive: spec.projectile.explosive(),
            life: PLAYER_BULLET_LIFE,
            size: spec.size,
            projectile: spec.projectile,
            color: spec.color,
            room,
        });
    }

    weapon.consume();
    player.fire_cooldown = spec.rate;
}

fn feedback(pos: Vec2, text: String, color: &str) -> GameEvent {
    GameEvent::SpawnText {
        pos: pos - Vec2::new(0.0, 20.0),
        text,
        color: color.to_string(),
    }
}

/// Collect the nearest pickup in range, if there is one
fn try_pickup(world: &mut World, player_id: PlayerId, events: &mut Vec<GameEvent>) {
    let World {
        players,
        dungeon,
        ids,
        ..
    } = world;
    let Some(player) = players.get_mut(&player_id) else {
        return;
    };
    let coord = player.room;
    let room = dungeon.room_mut(coord);

    let nearest = room
        .pickups
        .iter()
        .enumerate()
        .map(|(i, p)| (i, p.pos.distance(player.pos)))
        .filter(|&(_, d)| d < PICKUP_RANGE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i);
    let Some(index) = nearest else {
        return;
    };
    let taken = room.pickups.remove(index);

    match taken.kind {
        PickupKind::Health => {
            player.heal(HEAL_AMOUNT);
            events.push(feedback(taken.pos, format!("+{HEAL_AMOUNT} HP"), "#2ecc71"));
        }
        PickupKind::Ammo => {
            for weapon in player.weapons.iter_mut().flatten() {
                weapon.restock(AMMO_RESTOCK);
            }
            events.push(feedback(taken.pos, "+AMMO".to_string(), "#f39c12"));
        }
        PickupKind::Weapon(weapon) => {
            let spec = weapon.spec();
            if let Some(slot) = player.weapons.iter_mut().find(|s| s.is_none()) {
                *slot = Some(weapon);
                events.push(feedback(taken.pos, format!("GOT {}", spec.name), spec.color));
            } else {
                let active = player.weapon_idx;
                if let Some(old) = player.weapons[active].replace(weapon) {
                    let pickup = Pickup {
                        id: ids.pickup(),
                        pos: player.pos + heading(player.facing) * DROP_DISTANCE,
                        kind: PickupKind::Weapon(old),
                    };
                    room.pickups.push(pickup.clone());
                    events.push(GameEvent::WeaponDropped { pickup, room: coord });
                }
                events.push(feedback(taken.pos, format!("SWAP {}", spec.name), spec.color));
            }
        }
    }

    events.push(GameEvent::PickupTaken {
        pickup_id: taken.id,
        player_id,
        room: coord,
    });
}

/// First open door the player is standing on
fn crossed_door(world: &World, player_id: PlayerId) -> Option<Direction> {
    let player = world.players.get(&player_id)?;
    world
        .dungeon
        .open_doors(player.room)
        .into_iter()
        .find(|&d| player.pos.distance(door_position(d)) < DOOR_RADIUS)
}

/// Move a player through the door on the `dir` side of their room
fn enter_room(world: &mut World, player_id: PlayerId, dir: Direction, events: &mut Vec<GameEvent>) {
    let Some(player) = world.players.get_mut(&player_id) else {
        return;
    };
    let Some(dest) = player.room.step(dir) else {
        return;
    };
    player.room = dest;
    player.pos = entry_position(dir);
    let pos = player.pos;

    world
        .bullets
        .retain(|b| b.owner != Owner::Player(player_id));

    let room = world.dungeon.room(dest);
    if !room.spawned && !room.cleared {
        world.populate_room(dest);
    }

    log::debug!("Player {} entered room {}", player_id, dest.key());
    events.push(GameEvent::PlayerEnteredRoom {
        player_id,
        room: dest,
        from: dir,
        pos,
    });
}
