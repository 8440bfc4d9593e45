//! Tile-grid collision for actors and projectiles
//!
//! Every room shares the same footprint: a rectangle of floor tiles surrounded
//! by a one-tile wall ring. Anything outside the rectangle is wall too.

use glam::Vec2;

use crate::consts::*;

/// Inset kept between an actor's box and the room's outer edge when clamping
const CLAMP_MARGIN: f32 = 2.0;

/// True if the point lies on the wall ring or outside the room
pub fn is_wall(p: Vec2) -> bool {
    let col = (p.x / TILE).floor() as i32;
    let row = (p.y / TILE).floor() as i32;
    if col < ROOM_X || col >= ROOM_X + ROOM_W || row < ROOM_Y || row >= ROOM_Y + ROOM_H {
        return true;
    }
    col == ROOM_X || col == ROOM_X + ROOM_W - 1 || row == ROOM_Y || row == ROOM_Y + ROOM_H - 1
}

/// True if none of the four corners of the box touch a wall
pub fn box_clear(center: Vec2, half: Vec2) -> bool {
    !is_wall(Vec2::new(center.x - half.x, center.y - half.y))
        && !is_wall(Vec2::new(center.x + half.x, center.y - half.y))
        && !is_wall(Vec2::new(center.x - half.x, center.y + half.y))
        && !is_wall(Vec2::new(center.x + half.x, center.y + half.y))
}

/// Move an axis-aligned box by `delta`, resolving each axis separately
///
/// An axis whose move would put a corner in a wall is dropped, which lets
/// actors slide along walls when moving diagonally.
pub fn move_entity(pos: &mut Vec2, half: Vec2, delta: Vec2) {
    let min_x = ROOM_X as f32 * TILE + half.x + CLAMP_MARGIN;
    let max_x = (ROOM_X + ROOM_W) as f32 * TILE - half.x - CLAMP_MARGIN;
    let min_y = ROOM_Y as f32 * TILE + half.y + CLAMP_MARGIN;
    let max_y = (ROOM_Y + ROOM_H) as f32 * TILE - half.y - CLAMP_MARGIN;

    let nx = pos.x + delta.x;
    if box_clear(Vec2::new(nx, pos.y), half) {
        pos.x = nx.clamp(min_x, max_x);
    }

    let ny = pos.y + delta.y;
    if box_clear(Vec2::new(pos.x, ny), half) {
        pos.y = ny.clamp(min_y, max_y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn interior_min() -> f32 {
        (ROOM_X + 1) as f32 * TILE
    }

    #[test]
    fn test_wall_ring_and_outside() {
        assert!(is_wall(Vec2::new(0.0, 0.0)));
        // Left wall column
        assert!(is_wall(Vec2::new(ROOM_X as f32 * TILE + 1.0, 300.0)));
        // Bottom wall row
        assert!(is_wall(Vec2::new(400.0, (ROOM_Y + ROOM_H - 1) as f32 * TILE + 1.0)));
        // Past the right edge
        assert!(is_wall(Vec2::new(FIELD_W - 1.0, 300.0)));
        assert!(!is_wall(Vec2::new(400.0, 300.0)));
        assert!(!is_wall(Vec2::new(interior_min() + 0.5, interior_min() + 0.5)));
    }

    #[test]
    fn test_blocked_axis_slides() {
        let half = Vec2::splat(11.0);
        let mut pos = Vec2::new(interior_min() + 12.0, 300.0);
        // Diagonal into the left wall: x is rejected, y still applies
        move_entity(&mut pos, half, Vec2::new(-5.0, 3.0));
        assert_eq!(pos.x, interior_min() + 12.0);
        assert_eq!(pos.y, 303.0);
    }

    #[test]
    fn test_free_move() {
        let half = Vec2::splat(11.0);
        let mut pos = Vec2::new(400.0, 300.0);
        move_entity(&mut pos, half, Vec2::new(3.0, -2.0));
        assert_eq!(pos, Vec2::new(403.0, 298.0));
    }

    proptest! {
        #[test]
        fn prop_actor_stays_inside_room(
            half in 5.0f32..38.0,
            moves in prop::collection::vec((-60.0f32..60.0, -60.0f32..60.0), 1..200),
        ) {
            let half = Vec2::splat(half);
            let mut pos = Vec2::new(FIELD_W / 2.0, FIELD_H / 2.0);
            for (dx, dy) in moves {
                move_entity(&mut pos, half, Vec2::new(dx, dy));
                prop_assert!(box_clear(pos, half), "box overlaps a wall at {:?}", pos);
                prop_assert!(!is_wall(pos));
            }
        }
    }
}
