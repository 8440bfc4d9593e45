//! Bullet flight, impacts and explosions

use glam::Vec2;

use super::collision::is_wall;
use super::dungeon::{Dungeon, RoomCoord};
use super::entity::{Bullet, Owner, Player, PlayerId};
use super::event::GameEvent;
use super::state::World;

use indexmap::IndexMap;

/// Player hit radius for enemy bullets
pub const PLAYER_HIT_RADIUS: f32 = 14.0;
/// Ticks an enemy is frozen after being shot
pub const HIT_STUN_TICKS: u32 = 8;
pub const EXPLOSION_RADIUS: f32 = 60.0;
/// Damage at the centre of a blast
pub const EXPLOSION_PEAK_DAMAGE: f32 = 90.0;
/// Floor applied anywhere inside the blast radius
pub const EXPLOSION_MIN_DAMAGE: f32 = 10.0;

/// Advance every bullet one tick and resolve what it hits
///
/// A bullet is dropped on expiry, on wall contact, or on its first hit, and is
/// never processed again after that.
pub fn advance_bullets(world: &mut World, events: &mut Vec<GameEvent>) {
    let in_flight = std::mem::take(&mut world.bullets);
    let mut survivors = Vec::with_capacity(in_flight.len());

    for mut bullet in in_flight {
        bullet.pos += bullet.vel;
        bullet.life = bullet.life.saturating_sub(1);
        if bullet.life == 0 {
            continue;
        }

        if is_wall(bullet.pos) {
            if bullet.explosive {
                explode(&mut world.dungeon, bullet.pos, bullet.room, events);
            }
            continue;
        }

        let hit = match bullet.owner {
            Owner::Enemy => hit_player(&world.players, &bullet, events),
            Owner::Player(_) => hit_enemy(&mut world.dungeon, &bullet, events),
        };
        if !hit {
            survivors.push(bullet);
        }
    }

    world.bullets = survivors;
}

fn hit_player(
    players: &IndexMap<PlayerId, Player>,
    bullet: &Bullet,
    events: &mut Vec<GameEvent>,
) -> bool {
    let victim = players.values().find(|p| {
        p.alive
            && p.room == bullet.room
            && p.invincible == 0
            && p.pos.distance(bullet.pos) < PLAYER_HIT_RADIUS
    });
    match victim {
        Some(p) => {
            events.push(GameEvent::PlayerHit {
                player_id: p.id,
                damage: bullet.damage.round() as i32,
            });
            true
        }
        None => false,
    }
}

fn hit_enemy(dungeon: &mut Dungeon, bullet: &Bullet, events: &mut Vec<GameEvent>) -> bool {
    let room = dungeon.room_mut(bullet.room);
    let Some(index) = room
        .enemies
        .iter()
        .position(|e| e.pos.distance(bullet.pos) < e.size() + bullet.size)
    else {
        return false;
    };

    let enemy = &mut room.enemies[index];
    let died = enemy.take_damage(bullet.damage);
    enemy.stunned = HIT_STUN_TICKS;
    events.push(GameEvent::SpawnText {
        pos: enemy.pos - Vec2::new(0.0, 20.0),
        text: format!("-{}", bullet.damage.round() as i32),
        color: "#fff".to_string(),
    });

    if died {
        let dead = room.enemies.remove(index);
        events.push(GameEvent::EnemyKilled {
            enemy_id: dead.id,
            kind: dead.kind,
            pos: dead.pos,
            room: bullet.room,
        });
    }

    if bullet.explosive {
        explode(dungeon, bullet.pos, bullet.room, events);
    }
    true
}

/// Blast damage at `dist` from the impact point
pub fn explosion_damage(dist: f32) -> f32 {
    let falloff = (EXPLOSION_PEAK_DAMAGE * (1.0 - dist / EXPLOSION_RADIUS)).floor();
    falloff.max(EXPLOSION_MIN_DAMAGE)
}

/// Damage every enemy in `coord` within the blast radius of `pos`
pub fn explode(dungeon: &mut Dungeon, pos: Vec2, coord: RoomCoord, events: &mut Vec<GameEvent>) {
    let room = dungeon.room_mut(coord);
    room.enemies.retain_mut(|enemy| {
        let dist = enemy.pos.distance(pos);
        if dist >= EXPLOSION_RADIUS {
            return true;
        }
        if enemy.take_damage(explosion_damage(dist)) {
            events.push(GameEvent::EnemyKilled {
                enemy_id: enemy.id,
                kind: enemy.kind,
                pos: enemy.pos,
                room: coord,
            });
            return false;
        }
        true
    });
    events.push(GameEvent::Explosion { pos, room: coord });
}
