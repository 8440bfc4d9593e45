//! Enemy behaviour
//!
//! Only rooms with a living player are evaluated; everything else is frozen
//! until someone walks in.

use std::f32::consts::TAU;

use glam::Vec2;

use super::collision::move_entity;
use super::dungeon::{RoomCoord, RoomKind};
use super::entity::{Bullet, Enemy, IdCounters, Owner, PlayerId};
use super::event::GameEvent;
use super::state::World;
use crate::catalog::{Behavior, ProjectileKind};
use crate::heading;

/// Extra reach added to an enemy's size for contact damage
pub const MELEE_RANGE: f32 = 12.0;
/// Strafers close in until this distance, then circle
const STRAFE_DISTANCE: f32 = 160.0;
const ORBIT_RING: f32 = 180.0;
const BOSS_RING: f32 = 200.0;
/// Bullets in one boss burst
pub const BOSS_BURST: u32 = 8;
const BOSS_BULLET_SPEED: f32 = 7.0;
const BOSS_BULLET_SIZE: f32 = 5.0;
const AIMED_BULLET_SPEED: f32 = 5.0;
const AIMED_BULLET_SIZE: f32 = 4.0;
pub const ENEMY_BULLET_LIFE: u32 = 80;
const ENEMY_BULLET_COLOR: &str = "#e74c3c";

/// What an enemy can see of a player this tick
#[derive(Debug, Clone, Copy)]
struct Target {
    id: PlayerId,
    pos: Vec2,
    invincible: bool,
}

/// Run one tick of behaviour for every enemy in `coord`
pub fn update_room_enemies(world: &mut World, coord: RoomCoord, events: &mut Vec<GameEvent>) {
    let targets: Vec<Target> = world
        .players
        .values()
        .filter(|p| p.alive && p.room == coord)
        .map(|p| Target {
            id: p.id,
            pos: p.pos,
            invincible: p.invincible > 0,
        })
        .collect();
    if targets.is_empty() {
        return;
    }

    let World {
        dungeon,
        bullets,
        ids,
        ..
    } = world;
    let room = dungeon.room_mut(coord);

    for enemy in room.enemies.iter_mut() {
        if enemy.stunned > 0 {
            enemy.stunned -= 1;
            continue;
        }

        let Some(target) = nearest(&targets, enemy.pos) else {
            continue;
        };
        let to_target = target.pos - enemy.pos;
        let dist = to_target.length();
        let dir = if dist > 0.0 { to_target / dist } else { Vec2::X };

        steer(enemy, dir, dist, coord, bullets, ids);
        let (vel, half) = (enemy.vel, enemy.half_extents());
        move_entity(&mut enemy.pos, half, vel);

        let spec = enemy.spec();
        if spec.shoot_interval > 0 && spec.behavior != Behavior::Boss {
            if enemy.shoot_timer == 0 {
                let angle = (target.pos - enemy.pos).to_angle();
                bullets.push(enemy_bullet(
                    ids,
                    enemy.pos,
                    angle,
                    AIMED_BULLET_SPEED,
                    AIMED_BULLET_SIZE,
                    spec.bullet_damage,
                    coord,
                ));
                enemy.shoot_timer = spec.shoot_interval;
            } else {
                enemy.shoot_timer -= 1;
            }
        }

        let reach = enemy.size() + MELEE_RANGE;
        for t in &targets {
            if !t.invincible && enemy.pos.distance(t.pos) < reach {
                events.push(GameEvent::PlayerHit {
                    player_id: t.id,
                    damage: spec.damage,
                });
            }
        }
    }
}

fn nearest(targets: &[Target], from: Vec2) -> Option<Target> {
    targets
        .iter()
        .min_by(|a, b| {
            a.pos
                .distance_squared(from)
                .partial_cmp(&b.pos.distance_squared(from))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .copied()
}

/// Set the enemy's velocity for this tick from its behaviour pattern
fn steer(
    enemy: &mut Enemy,
    dir: Vec2,
    dist: f32,
    coord: RoomCoord,
    bullets: &mut Vec<Bullet>,
    ids: &mut IdCounters,
) {
    let spec = enemy.spec();
    let speed = spec.speed;
    enemy.vel = match spec.behavior {
        Behavior::Chase => dir * speed,
        Behavior::Strafe => {
            enemy.phase += 0.03;
            if dist > STRAFE_DISTANCE {
                dir * speed
            } else {
                heading(enemy.phase) * speed
            }
        }
        Behavior::Orbit => {
            enemy.phase += 0.02;
            let approach = (dist - ORBIT_RING) * 0.02;
            dir * approach + heading(enemy.phase) * speed
        }
        Behavior::Zigzag => {
            enemy.phase += 0.08;
            dir * speed + heading(enemy.phase) * 2.0
        }
        Behavior::Boss => {
            enemy.phase += 0.01;
            let approach = (dist - BOSS_RING) * 0.015;
            if enemy.shoot_timer == 0 {
                for i in 0..BOSS_BURST {
                    let angle = i as f32 / BOSS_BURST as f32 * TAU;
                    bullets.push(enemy_bullet(
                        ids,
                        enemy.pos,
                        angle,
                        BOSS_BULLET_SPEED,
                        BOSS_BULLET_SIZE,
                        spec.bullet_damage,
                        coord,
                    ));
                }
                enemy.shoot_timer = spec.shoot_interval;
            } else {
                enemy.shoot_timer -= 1;
            }
            dir * approach + heading(enemy.phase) * 1.5
        }
    };
}

fn enemy_bullet(
    ids: &mut IdCounters,
    pos: Vec2,
    angle: f32,
    speed: f32,
    size: f32,
    damage: i32,
    room: RoomCoord,
) -> Bullet {
    Bullet {
        id: ids.bullet(),
        pos,
        vel: heading(angle) * speed,
        angle,
        owner: Owner::Enemy,
        damage: damage as f32,
        explosive: false,
        life: ENEMY_BULLET_LIFE,
        size,
        projectile: ProjectileKind::Circle,
        color: ENEMY_BULLET_COLOR,
        room,
    }
}

/// Mark populated rooms whose enemies are all gone as cleared
///
/// Clearing is one-way, so each room emits at most one event per floor.
pub fn sweep_cleared_rooms(world: &mut World, events: &mut Vec<GameEvent>) {
    for coord in world.occupied_rooms() {
        let room = world.dungeon.room_mut(coord);
        if room.spawned && room.enemies.is_empty() && !room.cleared {
            room.cleared = true;
            events.push(GameEvent::RoomCleared {
                room: coord,
                chest: room.chest,
                boss: room.kind == RoomKind::Boss,
            });
        }
    }
}
