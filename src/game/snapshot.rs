//! Snapshot building for network transmission

use crate::ws::protocol::{
    BeamSnapshot, BulletSnapshot, GameSnapshot, ObstacleSnapshot, PlayerSnapshot, StrikeSnapshot,
};

use super::world::GameState;

/// Build a full wire snapshot from the authoritative state. Every tick
/// sends the whole state; at three players and a handful of projectiles
/// delta compression buys nothing.
pub fn build(state: &GameState) -> GameSnapshot {
    GameSnapshot {
        players: state
            .players
            .iter()
            .map(|p| PlayerSnapshot {
                id: p.id,
                x: p.x,
                y: p.y,
                angle: p.angle,
                hp: p.hp,
                alive: p.alive,
                color: p.color.to_string(),
                glow_color: p.glow_color.to_string(),
                airstrike_used: p.airstrike_used,
                laser_used: p.laser_used,
            })
            .collect(),
        bullets: state
            .bullets
            .iter()
            .map(|b| BulletSnapshot {
                x: b.x,
                y: b.y,
                vel_x: b.vel_x,
                vel_y: b.vel_y,
                owner: b.owner,
                color: b.color.to_string(),
            })
            .collect(),
        obstacles: state
            .obstacles
            .iter()
            .map(|o| ObstacleSnapshot {
                x: o.x,
                y: o.y,
                width: o.width,
                height: o.height,
            })
            .collect(),
        airstrikes: state
            .strikes
            .iter()
            .map(|s| StrikeSnapshot {
                x: s.x,
                y: s.y,
                radius: s.radius,
                owner: s.owner,
                color: s.color.to_string(),
                ticks_left: s.ticks_left,
                phase: s.phase,
            })
            .collect(),
        lasers: state
            .beams
            .iter()
            .map(|b| BeamSnapshot {
                start_x: b.start_x,
                start_y: b.start_y,
                end_x: b.end_x,
                end_y: b.end_y,
                owner: b.owner,
                color: b.color.to_string(),
                glow_color: b.glow_color.to_string(),
                ticks_left: b.ticks_left,
            })
            .collect(),
        winner: state.winner,
        game_over: state.game_over,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_mirrors_state() {
        let mut state = GameState::new(&[0, 2], 5);
        state.trigger_laser(0);

        let snap = build(&state);

        assert_eq!(snap.players.len(), 2);
        assert_eq!(snap.players[0].id, 0);
        assert_eq!(snap.players[1].id, 2);
        assert_eq!(snap.obstacles.len(), state.obstacles.len());
        assert_eq!(snap.lasers.len(), 1);
        assert!(snap.airstrikes.is_empty());
        assert!(!snap.game_over);
    }
}
