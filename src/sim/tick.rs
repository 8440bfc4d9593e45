//! Fixed timestep world step
//!
//! One call advances the world by one tick in a fixed order: player input,
//! enemy AI for occupied rooms, bullets, then the cleared-room sweep. Nothing
//! here touches the network; effects come back as events.

use super::ai::{sweep_cleared_rooms, update_room_enemies};
use super::entity::PlayerId;
use super::event::GameEvent;
use super::input::apply_player_input;
use super::projectile::advance_bullets;
use super::state::World;

/// Advance the world by one tick and return the effects it produced
pub fn step(world: &mut World) -> Vec<GameEvent> {
    let mut events = Vec::new();

    let living: Vec<PlayerId> = world
        .players
        .values()
        .filter(|p| p.alive)
        .map(|p| p.id)
        .collect();
    for id in living {
        apply_player_input(world, id, &mut events);
    }

    for coord in world.occupied_rooms() {
        update_room_enemies(world, coord, &mut events);
    }

    advance_bullets(world, &mut events);
    sweep_cleared_rooms(world, &mut events);

    events
}
