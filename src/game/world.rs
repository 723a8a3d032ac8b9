//! Authoritative match state and per-tick simulation

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use super::combat::{apply_damage, fire_weapon, AreaStrike, Beam, Bullet, StrikePhase};
use super::physics::{advance_movement, circle_overlaps_rect, point_segment_distance};
use super::TickInput;

pub const ARENA_W: f32 = 900.0;
pub const ARENA_H: f32 = 600.0;
pub const PLAYER_RADIUS: f32 = 18.0;
pub const BULLET_SPEED: f32 = 7.0;
pub const BULLET_RADIUS: f32 = 5.0;
pub const MOVE_SPEED: f32 = 3.0;
pub const ROTATE_SPEED: f32 = 0.06;
pub const SHOOT_COOLDOWN_MS: u64 = 300;
pub const MAX_HP: i32 = 5;

pub const AIRSTRIKE_RADIUS: f32 = 60.0;
pub const AIRSTRIKE_DAMAGE: i32 = 3;
pub const AIRSTRIKE_COUNT: usize = 5;
/// Warning duration before detonation (1.5 s at 30 ticks/sec)
pub const AIRSTRIKE_WARN_TICKS: i32 = 45;
/// Explosion display duration (0.4 s)
pub const AIRSTRIKE_EXPLODE_TICKS: i32 = 12;
/// Full scatter span around the target, per axis
const AIRSTRIKE_SCATTER: f32 = 120.0;

pub const LASER_WIDTH: f32 = 8.0;
pub const LASER_DISPLAY_TICKS: i32 = 15;
const LASER_TRACE_STEP: f32 = 2.0;
const LASER_TRACE_MAX: f32 = 1500.0;

/// Winner value reported when the last players die on the same tick
pub const DRAW: i32 = -1;

pub const MAX_SLOTS: usize = 3;

pub const SPAWN_POINTS: [(f32, f32); MAX_SLOTS] =
    [(100.0, 100.0), (800.0, 100.0), (450.0, 500.0)];

pub const SPAWN_ANGLES: [f32; MAX_SLOTS] = [FRAC_PI_4, 3.0 * FRAC_PI_4, -FRAC_PI_2];

pub const PLAYER_COLORS: [(&str, &str); MAX_SLOTS] = [
    ("hsl(160, 100%, 50%)", "hsl(160, 100%, 60%)"),
    ("hsl(280, 100%, 65%)", "hsl(280, 100%, 75%)"),
    ("hsl(30, 100%, 55%)", "hsl(30, 100%, 65%)"),
];

/// Static axis-aligned obstacle
#[derive(Debug, Clone, Copy)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// The fixed obstacle layout, mirrored left-right around the arena center
pub fn arena_obstacles() -> Vec<Obstacle> {
    [
        (200.0, 150.0, 80.0, 30.0),
        (620.0, 150.0, 80.0, 30.0),
        (410.0, 280.0, 80.0, 40.0),
        (150.0, 400.0, 30.0, 80.0),
        (720.0, 400.0, 30.0, 80.0),
        (350.0, 460.0, 60.0, 25.0),
        (490.0, 460.0, 60.0, 25.0),
        (100.0, 250.0, 50.0, 20.0),
        (750.0, 250.0, 50.0, 20.0),
    ]
    .into_iter()
    .map(|(x, y, width, height)| Obstacle {
        x,
        y,
        width,
        height,
    })
    .collect()
}

/// Player state in a match (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    /// Slot id, doubles as the player's public identity in a match
    pub id: u8,
    pub x: f32,
    pub y: f32,
    /// Facing angle in radians
    pub angle: f32,
    pub hp: i32,
    pub alive: bool,
    /// Unix millis of the last shot, for the weapon cooldown
    pub last_shot: u64,
    pub airstrike_used: bool,
    pub laser_used: bool,
    pub color: &'static str,
    pub glow_color: &'static str,
}

impl Player {
    /// Create a player at the slot's fixed spawn point and facing
    pub fn new(slot: usize) -> Self {
        let (x, y) = SPAWN_POINTS[slot];
        let (color, glow_color) = PLAYER_COLORS[slot];
        Self {
            id: slot as u8,
            x,
            y,
            angle: SPAWN_ANGLES[slot],
            hp: MAX_HP,
            alive: true,
            last_shot: 0,
            airstrike_used: false,
            laser_used: false,
            color,
            glow_color,
        }
    }
}

/// Full simulation state for one match (owned by its room task)
pub struct GameState {
    pub players: Vec<Player>,
    pub bullets: Vec<Bullet>,
    pub obstacles: Vec<Obstacle>,
    pub strikes: Vec<AreaStrike>,
    pub beams: Vec<Beam>,
    /// Winning slot id, or [`DRAW`]; set on the same tick as `game_over`
    pub winner: Option<i32>,
    pub game_over: bool,
    rng: ChaCha8Rng,
}

impl GameState {
    /// Build the initial state from the occupied slots; unoccupied slots
    /// produce no player, so a 2-player match is valid.
    pub fn new(slots: &[usize], seed: u64) -> Self {
        Self {
            players: slots.iter().map(|&slot| Player::new(slot)).collect(),
            bullets: Vec::new(),
            obstacles: arena_obstacles(),
            strikes: Vec::new(),
            beams: Vec::new(),
            winner: None,
            game_over: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn player(&self, slot: u8) -> Option<&Player> {
        self.players.iter().find(|p| p.id == slot)
    }

    pub fn player_mut(&mut self, slot: u8) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == slot)
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.alive).count()
    }

    /// Apply one client's buffered input for this tick: movement plus an
    /// optional shot gated by the weapon cooldown.
    pub fn apply_input(&mut self, slot: u8, input: &TickInput, now: u64) {
        let Self {
            players,
            bullets,
            obstacles,
            ..
        } = self;

        let Some(player) = players.iter_mut().find(|p| p.id == slot) else {
            return;
        };

        advance_movement(player, input.forward, input.rotate, obstacles);

        if input.shoot {
            if let Some(bullet) = fire_weapon(player, now) {
                bullets.push(bullet);
            }
        }
    }

    /// Advance every bullet one tick and resolve hits. A bullet is dropped
    /// on leaving the arena, entering an obstacle, or on its first hit
    /// against a living non-owner player (one point of damage). Afterwards
    /// the win state is updated once the living count drops to one or zero.
    pub fn advance_bullets(&mut self) {
        let Self {
            players,
            bullets,
            obstacles,
            ..
        } = self;

        bullets.retain_mut(|bullet| {
            bullet.x += bullet.vel_x;
            bullet.y += bullet.vel_y;

            if bullet.x < 0.0 || bullet.x > ARENA_W || bullet.y < 0.0 || bullet.y > ARENA_H {
                return false;
            }
            if obstacles
                .iter()
                .any(|o| circle_overlaps_rect(o, bullet.x, bullet.y, BULLET_RADIUS))
            {
                return false;
            }

            for player in players.iter_mut() {
                if player.id == bullet.owner || !player.alive {
                    continue;
                }
                let dx = player.x - bullet.x;
                let dy = player.y - bullet.y;
                let hit_radius = PLAYER_RADIUS + BULLET_RADIUS;
                if dx * dx + dy * dy < hit_radius * hit_radius {
                    apply_damage(player, 1);
                    return false;
                }
            }
            true
        });

        if !self.game_over {
            let alive: Vec<u8> = self
                .players
                .iter()
                .filter(|p| p.alive)
                .map(|p| p.id)
                .collect();
            if alive.len() <= 1 {
                self.game_over = true;
                self.winner = Some(alive.first().map(|&id| id as i32).unwrap_or(DRAW));
            }
        }
    }

    /// Launch the caller's one-shot airstrike: a cluster of delayed strikes
    /// scattered around each living enemy's current position. Returns false
    /// without side effect when the caller is missing, dead, or has already
    /// used the ability.
    pub fn trigger_airstrike(&mut self, caller: u8) -> bool {
        let Some(player) = self.players.iter_mut().find(|p| p.id == caller) else {
            return false;
        };
        if !player.alive || player.airstrike_used {
            return false;
        }
        player.airstrike_used = true;
        let color = player.color;

        let targets: Vec<(f32, f32)> = self
            .players
            .iter()
            .filter(|p| p.id != caller && p.alive)
            .map(|p| (p.x, p.y))
            .collect();
        if targets.is_empty() {
            return true;
        }

        // Split the configured total across enemies, rounding up so a lone
        // survivor still draws the full barrage.
        let per_target = AIRSTRIKE_COUNT.div_ceil(targets.len());

        for (tx, ty) in targets {
            for _ in 0..per_target {
                let offset_x = (self.rng.gen::<f32>() - 0.5) * AIRSTRIKE_SCATTER;
                let offset_y = (self.rng.gen::<f32>() - 0.5) * AIRSTRIKE_SCATTER;
                self.strikes.push(AreaStrike {
                    x: (tx + offset_x).clamp(AIRSTRIKE_RADIUS, ARENA_W - AIRSTRIKE_RADIUS),
                    y: (ty + offset_y).clamp(AIRSTRIKE_RADIUS, ARENA_H - AIRSTRIKE_RADIUS),
                    radius: AIRSTRIKE_RADIUS,
                    owner: caller,
                    color,
                    // Jitter so simultaneous barrages do not detonate in lockstep
                    ticks_left: AIRSTRIKE_WARN_TICKS + self.rng.gen_range(0..10),
                    phase: StrikePhase::Warning,
                });
            }
        }
        true
    }

    /// Count down every strike. At the warning-to-explode transition splash
    /// damage is applied exactly once to living enemies of the owner inside
    /// the blast circle; the explosion then displays until its counter runs
    /// out and the strike is removed.
    pub fn advance_strikes(&mut self) {
        let Self {
            players, strikes, ..
        } = self;

        strikes.retain_mut(|strike| {
            strike.ticks_left -= 1;

            if strike.phase == StrikePhase::Warning && strike.ticks_left <= 0 {
                strike.phase = StrikePhase::Explode;
                strike.ticks_left = AIRSTRIKE_EXPLODE_TICKS;

                for player in players.iter_mut() {
                    if player.id == strike.owner || !player.alive {
                        continue;
                    }
                    let dx = player.x - strike.x;
                    let dy = player.y - strike.y;
                    let blast = strike.radius + PLAYER_RADIUS;
                    if dx * dx + dy * dy < blast * blast {
                        apply_damage(player, AIRSTRIKE_DAMAGE);
                    }
                }
            }

            strike.ticks_left > 0
        });
    }

    /// Fire the caller's one-shot laser. The beam is marched from just in
    /// front of the caller along its facing until it leaves the arena, and
    /// every living enemy close enough to the segment is killed outright at
    /// trigger time. Returns false under the same guards as the airstrike.
    pub fn trigger_laser(&mut self, caller: u8) -> bool {
        let Some(player) = self.players.iter_mut().find(|p| p.id == caller) else {
            return false;
        };
        if !player.alive || player.laser_used {
            return false;
        }
        player.laser_used = true;

        let (px, py, angle) = (player.x, player.y, player.angle);
        let (color, glow_color) = (player.color, player.glow_color);

        let dir_x = angle.cos();
        let dir_y = angle.sin();
        let start_x = px + dir_x * (PLAYER_RADIUS + 5.0);
        let start_y = py + dir_y * (PLAYER_RADIUS + 5.0);

        // March in fixed steps until the beam exits the arena
        let mut end_x = start_x;
        let mut end_y = start_y;
        let mut t = 0.0;
        while t < LASER_TRACE_MAX {
            end_x = start_x + dir_x * t;
            end_y = start_y + dir_y * t;
            if end_x < 0.0 || end_x > ARENA_W || end_y < 0.0 || end_y > ARENA_H {
                break;
            }
            t += LASER_TRACE_STEP;
        }

        for enemy in self.players.iter_mut() {
            if enemy.id == caller || !enemy.alive {
                continue;
            }
            let dist = point_segment_distance(enemy.x, enemy.y, start_x, start_y, end_x, end_y);
            if dist < LASER_WIDTH + PLAYER_RADIUS {
                enemy.hp = 0;
                enemy.alive = false;
            }
        }

        self.beams.push(Beam {
            start_x,
            start_y,
            end_x,
            end_y,
            owner: caller,
            color,
            glow_color,
            ticks_left: LASER_DISPLAY_TICKS,
        });
        true
    }

    /// Cosmetic bookkeeping: expire beam display records.
    pub fn advance_beams(&mut self) {
        self.beams.retain_mut(|beam| {
            beam.ticks_left -= 1;
            beam.ticks_left > 0
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_player_state() -> GameState {
        GameState::new(&[0, 1], 42)
    }

    fn bullet(x: f32, y: f32, vel_x: f32, vel_y: f32, owner: u8) -> Bullet {
        Bullet {
            x,
            y,
            vel_x,
            vel_y,
            owner,
            color: PLAYER_COLORS[owner as usize].0,
        }
    }

    #[test]
    fn initial_state_matches_occupied_slots() {
        let state = GameState::new(&[0, 2], 1);

        assert_eq!(state.players.len(), 2);
        let p0 = state.player(0).unwrap();
        assert_eq!((p0.x, p0.y), SPAWN_POINTS[0]);
        assert_eq!(p0.angle, SPAWN_ANGLES[0]);
        let p2 = state.player(2).unwrap();
        assert_eq!((p2.x, p2.y), SPAWN_POINTS[2]);
        assert!(state.player(1).is_none());
        assert!(!state.game_over);
        assert!(state.winner.is_none());
    }

    #[test]
    fn point_blank_bullet_hits_for_one_damage() {
        let mut state = two_player_state();
        {
            let p0 = state.player_mut(0).unwrap();
            p0.x = 300.0;
            p0.y = 300.0;
            p0.angle = 0.0;
        }
        {
            let p1 = state.player_mut(1).unwrap();
            p1.x = 350.0;
            p1.y = 300.0;
        }

        state.apply_input(
            0,
            &TickInput {
                forward: 0.0,
                rotate: 0.0,
                shoot: true,
            },
            1000,
        );
        assert_eq!(state.bullets.len(), 1);

        // One advance moves the bullet from x=323 to x=330, within 23 px of p1
        state.advance_bullets();

        assert_eq!(state.player(1).unwrap().hp, MAX_HP - 1);
        assert!(state.bullets.is_empty());
        assert!(!state.game_over);
    }

    #[test]
    fn bullet_never_damages_its_owner() {
        let mut state = two_player_state();
        let (x, y) = {
            let p0 = state.player(0).unwrap();
            (p0.x, p0.y)
        };
        state.bullets.push(bullet(x, y, 0.0, 0.0, 0));

        state.advance_bullets();

        assert_eq!(state.player(0).unwrap().hp, MAX_HP);
        assert_eq!(state.bullets.len(), 1);
    }

    #[test]
    fn bullet_dropped_out_of_bounds_without_damage() {
        let mut state = two_player_state();
        state.bullets.push(bullet(ARENA_W - 2.0, 300.0, 7.0, 0.0, 0));

        state.advance_bullets();

        assert!(state.bullets.is_empty());
        assert_eq!(state.player(1).unwrap().hp, MAX_HP);
    }

    #[test]
    fn bullet_dropped_on_obstacle() {
        let mut state = two_player_state();
        // Heading into the obstacle at (410, 280, 80, 40)
        state.bullets.push(bullet(400.0, 300.0, 7.0, 0.0, 0));

        state.advance_bullets();

        assert!(state.bullets.is_empty());
    }

    #[test]
    fn dead_player_takes_no_further_damage() {
        let mut state = two_player_state();
        {
            let p1 = state.player_mut(1).unwrap();
            p1.hp = 0;
            p1.alive = false;
        }
        let (x, y) = {
            let p1 = state.player(1).unwrap();
            (p1.x, p1.y)
        };
        state.bullets.push(bullet(x - 7.0, y, 7.0, 0.0, 0));

        state.advance_bullets();

        assert_eq!(state.player(1).unwrap().hp, 0);
        // The bullet passes through and survives the tick
        assert_eq!(state.bullets.len(), 1);
    }

    #[test]
    fn dead_player_cannot_shoot() {
        let mut state = two_player_state();
        {
            let p0 = state.player_mut(0).unwrap();
            p0.alive = false;
            p0.hp = 0;
        }

        state.apply_input(
            0,
            &TickInput {
                forward: 1.0,
                rotate: 0.0,
                shoot: true,
            },
            1000,
        );

        assert!(state.bullets.is_empty());
        assert_eq!(state.player(0).unwrap().x, SPAWN_POINTS[0].0);
    }

    #[test]
    fn game_over_declared_once_with_survivor() {
        let mut state = two_player_state();
        {
            let p1 = state.player_mut(1).unwrap();
            p1.hp = 0;
            p1.alive = false;
        }

        state.advance_bullets();
        assert!(state.game_over);
        assert_eq!(state.winner, Some(0));

        // Killing the survivor afterwards must not change the result
        {
            let p0 = state.player_mut(0).unwrap();
            p0.hp = 0;
            p0.alive = false;
        }
        state.advance_bullets();
        assert_eq!(state.winner, Some(0));
    }

    #[test]
    fn simultaneous_last_kills_score_a_draw() {
        let mut state = two_player_state();
        state.player_mut(0).unwrap().hp = 1;
        state.player_mut(1).unwrap().hp = 1;

        // p0 at (100,100), p1 at (800,100); both bullets land this tick
        state.bullets.push(bullet(790.0, 100.0, 7.0, 0.0, 0));
        state.bullets.push(bullet(110.0, 100.0, -7.0, 0.0, 1));

        state.advance_bullets();

        assert!(state.game_over);
        assert_eq!(state.winner, Some(DRAW));
    }

    #[test]
    fn airstrike_single_enemy_gets_full_cluster() {
        let mut state = two_player_state();

        assert!(state.trigger_airstrike(0));

        assert_eq!(state.strikes.len(), AIRSTRIKE_COUNT);
        for strike in &state.strikes {
            assert_eq!(strike.phase, StrikePhase::Warning);
            assert_eq!(strike.owner, 0);
            assert!(strike.x >= AIRSTRIKE_RADIUS && strike.x <= ARENA_W - AIRSTRIKE_RADIUS);
            assert!(strike.y >= AIRSTRIKE_RADIUS && strike.y <= ARENA_H - AIRSTRIKE_RADIUS);
            assert!(strike.ticks_left >= AIRSTRIKE_WARN_TICKS);
            assert!(strike.ticks_left < AIRSTRIKE_WARN_TICKS + 10);
        }
    }

    #[test]
    fn airstrike_cluster_split_across_enemies() {
        let mut state = GameState::new(&[0, 1, 2], 7);

        assert!(state.trigger_airstrike(0));

        // ceil(5 / 2) = 3 strikes per enemy
        assert_eq!(state.strikes.len(), 6);
    }

    #[test]
    fn airstrike_is_one_shot() {
        let mut state = two_player_state();

        assert!(state.trigger_airstrike(0));
        let placed = state.strikes.len();

        assert!(!state.trigger_airstrike(0));
        assert_eq!(state.strikes.len(), placed);
        assert!(state.player(0).unwrap().airstrike_used);
    }

    #[test]
    fn airstrike_rejected_for_dead_caller() {
        let mut state = two_player_state();
        {
            let p0 = state.player_mut(0).unwrap();
            p0.hp = 0;
            p0.alive = false;
        }

        assert!(!state.trigger_airstrike(0));
        assert!(!state.player(0).unwrap().airstrike_used);
        assert!(state.strikes.is_empty());
    }

    #[test]
    fn strike_detonation_damages_once() {
        let mut state = two_player_state();
        let (x, y) = {
            let p1 = state.player(1).unwrap();
            (p1.x, p1.y)
        };
        state.strikes.push(AreaStrike {
            x,
            y,
            radius: AIRSTRIKE_RADIUS,
            owner: 0,
            color: PLAYER_COLORS[0].0,
            ticks_left: 1,
            phase: StrikePhase::Warning,
        });

        state.advance_strikes();
        assert_eq!(state.player(1).unwrap().hp, MAX_HP - AIRSTRIKE_DAMAGE);
        assert_eq!(state.strikes[0].phase, StrikePhase::Explode);

        // The explosion lingers for display but never damages again
        for _ in 0..AIRSTRIKE_EXPLODE_TICKS {
            state.advance_strikes();
        }
        assert_eq!(state.player(1).unwrap().hp, MAX_HP - AIRSTRIKE_DAMAGE);
        assert!(state.strikes.is_empty());
    }

    #[test]
    fn strike_does_not_damage_its_owner() {
        let mut state = two_player_state();
        let (x, y) = {
            let p0 = state.player(0).unwrap();
            (p0.x, p0.y)
        };
        state.strikes.push(AreaStrike {
            x,
            y,
            radius: AIRSTRIKE_RADIUS,
            owner: 0,
            color: PLAYER_COLORS[0].0,
            ticks_left: 1,
            phase: StrikePhase::Warning,
        });

        state.advance_strikes();

        assert_eq!(state.player(0).unwrap().hp, MAX_HP);
    }

    #[test]
    fn laser_kills_enemy_in_line_instantly() {
        let mut state = two_player_state();
        {
            let p0 = state.player_mut(0).unwrap();
            p0.x = 300.0;
            p0.y = 300.0;
            p0.angle = 0.0;
        }
        {
            let p1 = state.player_mut(1).unwrap();
            p1.x = 500.0;
            p1.y = 300.0;
        }

        assert!(state.trigger_laser(0));

        let p1 = state.player(1).unwrap();
        assert_eq!(p1.hp, 0);
        assert!(!p1.alive);
        assert_eq!(state.beams.len(), 1);
        // Traced all the way out of the arena to the right
        assert!(state.beams[0].end_x > ARENA_W);
    }

    #[test]
    fn laser_misses_enemy_off_line() {
        let mut state = two_player_state();
        {
            let p0 = state.player_mut(0).unwrap();
            p0.x = 300.0;
            p0.y = 300.0;
            p0.angle = 0.0;
        }
        {
            let p1 = state.player_mut(1).unwrap();
            p1.x = 500.0;
            p1.y = 400.0;
        }

        assert!(state.trigger_laser(0));

        let p1 = state.player(1).unwrap();
        assert_eq!(p1.hp, MAX_HP);
        assert!(p1.alive);
    }

    #[test]
    fn laser_is_one_shot() {
        let mut state = two_player_state();

        assert!(state.trigger_laser(0));
        assert!(!state.trigger_laser(0));
        assert_eq!(state.beams.len(), 1);
    }

    #[test]
    fn beams_expire_after_display_window() {
        let mut state = two_player_state();
        assert!(state.trigger_laser(0));

        for _ in 0..LASER_DISPLAY_TICKS {
            state.advance_beams();
        }

        assert!(state.beams.is_empty());
    }
}
