//! Arena geometry and movement constraints

use super::world::{Obstacle, Player, ARENA_H, ARENA_W, MOVE_SPEED, PLAYER_RADIUS, ROTATE_SPEED};

/// Check whether a circle overlaps an axis-aligned rectangle.
/// Closest-point-on-rectangle with a squared-distance compare, so a circle
/// can graze a corner without counting as overlap.
pub fn circle_overlaps_rect(obs: &Obstacle, px: f32, py: f32, radius: f32) -> bool {
    let closest_x = px.clamp(obs.x, obs.x + obs.width);
    let closest_y = py.clamp(obs.y, obs.y + obs.height);
    let dx = px - closest_x;
    let dy = py - closest_y;
    dx * dx + dy * dy < radius * radius
}

/// Distance from a point to the nearest point on segment (ax,ay)-(bx,by).
pub fn point_segment_distance(px: f32, py: f32, ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let abx = bx - ax;
    let aby = by - ay;
    let ab_len_sq = abx * abx + aby * aby;
    if ab_len_sq <= f32::EPSILON {
        // Degenerate segment, fall back to point distance
        return (px - ax).hypot(py - ay);
    }
    let t = (((px - ax) * abx + (py - ay) * aby) / ab_len_sq).clamp(0.0, 1.0);
    let closest_x = ax + t * abx;
    let closest_y = ay + t * aby;
    (px - closest_x).hypot(py - closest_y)
}

/// Advance one player's movement for a tick. Rotation always applies;
/// translation is rejected wholesale when the destination circle overlaps
/// any obstacle, and otherwise clamped per-axis into the arena.
pub fn advance_movement(player: &mut Player, forward: f32, rotate: f32, obstacles: &[Obstacle]) {
    if !player.alive {
        return;
    }

    player.angle += rotate * ROTATE_SPEED;

    let nx = player.x + player.angle.cos() * forward * MOVE_SPEED;
    let ny = player.y + player.angle.sin() * forward * MOVE_SPEED;

    let blocked = obstacles
        .iter()
        .any(|o| circle_overlaps_rect(o, nx, ny, PLAYER_RADIUS));
    if !blocked {
        player.x = nx.clamp(PLAYER_RADIUS, ARENA_W - PLAYER_RADIUS);
        player.y = ny.clamp(PLAYER_RADIUS, ARENA_H - PLAYER_RADIUS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32, y: f32, width: f32, height: f32) -> Obstacle {
        Obstacle {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn circle_inside_rect_overlaps() {
        let obs = rect(100.0, 100.0, 80.0, 30.0);
        assert!(circle_overlaps_rect(&obs, 120.0, 110.0, 5.0));
    }

    #[test]
    fn circle_touching_edge_overlaps() {
        let obs = rect(100.0, 100.0, 80.0, 30.0);
        // 4 px to the left of the rectangle with radius 5
        assert!(circle_overlaps_rect(&obs, 96.0, 110.0, 5.0));
    }

    #[test]
    fn circle_grazing_corner_does_not_overlap() {
        let obs = rect(100.0, 100.0, 80.0, 30.0);
        // 4,4 diagonal from the corner: distance ~5.66 > radius 5
        assert!(!circle_overlaps_rect(&obs, 96.0, 96.0, 5.0));
    }

    #[test]
    fn circle_far_away_does_not_overlap() {
        let obs = rect(100.0, 100.0, 80.0, 30.0);
        assert!(!circle_overlaps_rect(&obs, 500.0, 500.0, 18.0));
    }

    #[test]
    fn segment_distance_perpendicular() {
        let d = point_segment_distance(50.0, 10.0, 0.0, 0.0, 100.0, 0.0);
        assert!((d - 10.0).abs() < 1e-5);
    }

    #[test]
    fn segment_distance_past_endpoint() {
        // Beyond the far endpoint the distance is to the endpoint itself
        let d = point_segment_distance(110.0, 0.0, 0.0, 0.0, 100.0, 0.0);
        assert!((d - 10.0).abs() < 1e-5);
    }

    #[test]
    fn segment_distance_degenerate() {
        let d = point_segment_distance(3.0, 4.0, 0.0, 0.0, 0.0, 0.0);
        assert!((d - 5.0).abs() < 1e-5);
    }

    #[test]
    fn blocked_move_keeps_position_but_rotates() {
        let mut player = Player::new(0);
        player.x = 150.0;
        player.y = 165.0;
        player.angle = 0.0;
        let obstacles = vec![rect(160.0, 150.0, 80.0, 30.0)];

        advance_movement(&mut player, 1.0, 1.0, &obstacles);

        assert_eq!(player.x, 150.0);
        assert_eq!(player.y, 165.0);
        assert!((player.angle - ROTATE_SPEED).abs() < 1e-6);
    }

    #[test]
    fn move_clamps_to_arena_bounds() {
        let mut player = Player::new(0);
        player.x = ARENA_W - PLAYER_RADIUS;
        player.y = 300.0;
        player.angle = 0.0;

        advance_movement(&mut player, 1.0, 0.0, &[]);

        assert_eq!(player.x, ARENA_W - PLAYER_RADIUS);
        assert_eq!(player.y, 300.0);
    }

    #[test]
    fn dead_player_does_not_move_or_rotate() {
        let mut player = Player::new(0);
        player.alive = false;
        let (x, y, angle) = (player.x, player.y, player.angle);

        advance_movement(&mut player, 1.0, 1.0, &[]);

        assert_eq!((player.x, player.y, player.angle), (x, y, angle));
    }
}
