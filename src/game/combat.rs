//! Combat entities - bullets, airstrikes, laser beams

use serde::{Deserialize, Serialize};

use super::world::{Player, BULLET_SPEED, PLAYER_RADIUS, SHOOT_COOLDOWN_MS};

/// Active bullet in the game
#[derive(Debug, Clone)]
pub struct Bullet {
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    /// Slot id of the shooter; bullets never damage their owner
    pub owner: u8,
    pub color: &'static str,
}

/// Lifecycle of one airstrike marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrikePhase {
    /// Telegraphed on the ground, no damage yet
    Warning,
    /// Detonated; damage was applied at the transition into this phase
    Explode,
}

/// One delayed-detonation airstrike marker
#[derive(Debug, Clone)]
pub struct AreaStrike {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub owner: u8,
    pub color: &'static str,
    pub ticks_left: i32,
    pub phase: StrikePhase,
}

/// Cosmetic record of a fired laser; damage is resolved at trigger time
#[derive(Debug, Clone)]
pub struct Beam {
    pub start_x: f32,
    pub start_y: f32,
    pub end_x: f32,
    pub end_y: f32,
    pub owner: u8,
    pub color: &'static str,
    pub glow_color: &'static str,
    pub ticks_left: i32,
}

/// Fire the player's weapon. Stamps the cooldown and returns the spawned
/// bullet, or `None` when the player is dead or still cooling down.
pub fn fire_weapon(player: &mut Player, now: u64) -> Option<Bullet> {
    if !player.alive || now.saturating_sub(player.last_shot) < SHOOT_COOLDOWN_MS {
        return None;
    }
    player.last_shot = now;

    // Spawn just past the player's own hitbox so the shot clears the shooter
    let spawn_offset = PLAYER_RADIUS + 5.0;
    Some(Bullet {
        x: player.x + player.angle.cos() * spawn_offset,
        y: player.y + player.angle.sin() * spawn_offset,
        vel_x: player.angle.cos() * BULLET_SPEED,
        vel_y: player.angle.sin() * BULLET_SPEED,
        owner: player.id,
        color: player.color,
    })
}

/// Apply damage to a player, clamping health at zero and marking death.
pub fn apply_damage(player: &mut Player, damage: i32) {
    player.hp -= damage;
    if player.hp <= 0 {
        player.hp = 0;
        player.alive = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::world::MAX_HP;

    #[test]
    fn fire_respects_cooldown() {
        let mut player = Player::new(0);

        assert!(fire_weapon(&mut player, 1000).is_some());
        assert!(fire_weapon(&mut player, 1200).is_none());
        assert!(fire_weapon(&mut player, 1300).is_some());
    }

    #[test]
    fn dead_player_cannot_fire() {
        let mut player = Player::new(0);
        player.alive = false;

        assert!(fire_weapon(&mut player, 1000).is_none());
        assert_eq!(player.last_shot, 0);
    }

    #[test]
    fn bullet_spawns_ahead_of_shooter() {
        let mut player = Player::new(0);
        player.x = 300.0;
        player.y = 200.0;
        player.angle = 0.0;

        let bullet = fire_weapon(&mut player, 1000).unwrap();

        assert_eq!(bullet.owner, 0);
        assert!((bullet.x - (300.0 + PLAYER_RADIUS + 5.0)).abs() < 1e-4);
        assert!((bullet.y - 200.0).abs() < 1e-4);
        assert!((bullet.vel_x - BULLET_SPEED).abs() < 1e-4);
    }

    #[test]
    fn damage_clamps_at_zero_and_kills() {
        let mut player = Player::new(1);
        apply_damage(&mut player, 2);
        assert_eq!(player.hp, MAX_HP - 2);
        assert!(player.alive);

        apply_damage(&mut player, 10);
        assert_eq!(player.hp, 0);
        assert!(!player.alive);
    }
}
