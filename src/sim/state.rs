//! Game state and core simulation types
//!
//! Everything a run mutates lives here. Balance data stays in
//! [`Rules`](super::rules::Rules) and is only read.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::difficulty::DifficultyState;
use super::events::GameOverReport;
use super::rules::Rules;
use super::spawner::{CollectibleSpawn, HazardSpawn, Spawner};
use super::timed::{TimedEffectKind, TimedEffects};
use crate::tuning::{Playfield, ShipTuning, SizeClass};

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Simulation frozen, waiting for the pause toggle
    Paused,
    /// Run ended; terminal until a restart
    GameOver,
}

/// The player's ship
#[derive(Debug, Clone)]
pub struct Ship {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Facing in radians, 0 = up
    pub rotation: f32,
    pub health: u32,
    pub max_health: u32,
}

impl Ship {
    pub fn new(tuning: &ShipTuning, field: &Playfield) -> Self {
        Self {
            pos: field.center(),
            vel: Vec2::ZERO,
            radius: tuning.radius,
            rotation: 0.0,
            health: tuning.max_health,
            max_health: tuning.max_health,
        }
    }

    /// Accelerate toward `direction` (or brake when it is zero), move, and
    /// keep the hull inside the playfield.
    pub fn steer(&mut self, direction: Vec2, dt: f32, tuning: &ShipTuning, field: &Playfield) {
        if let Some(dir) = direction.try_normalize() {
            self.vel += dir * tuning.acceleration * dt;
            self.vel = self.vel.clamp_length_max(tuning.max_speed);
        } else {
            let speed = self.vel.length();
            let braking = tuning.deceleration * dt;
            self.vel = if speed <= braking {
                Vec2::ZERO
            } else {
                self.vel - self.vel / speed * braking
            };
        }

        self.pos += self.vel * dt;

        let r = self.radius;
        if self.pos.x < r {
            self.pos.x = r;
            self.vel.x = 0.0;
        } else if self.pos.x > field.width - r {
            self.pos.x = field.width - r;
            self.vel.x = 0.0;
        }
        if self.pos.y < r {
            self.pos.y = r;
            self.vel.y = 0.0;
        } else if self.pos.y > field.height - r {
            self.pos.y = field.height - r;
            self.vel.y = 0.0;
        }

        // Face the direction of travel once moving
        if self.vel.length_squared() > 0.25 {
            self.rotation = self.vel.y.atan2(self.vel.x) + FRAC_PI_2;
        }
    }

    /// Subtract damage, saturating at zero. Returns the damage actually dealt.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let before = self.health;
        self.health = self.health.saturating_sub(amount);
        before - self.health
    }

    /// Returns the health actually restored
    pub fn heal(&mut self, amount: u32) -> u32 {
        let before = self.health;
        self.health = self.health.saturating_add(amount).min(self.max_health);
        self.health - before
    }

    /// Heal by a percentage of max health
    pub fn heal_percent(&mut self, percent: f32) -> u32 {
        let amount = (self.max_health as f32 * percent.max(0.0) / 100.0).round() as u32;
        self.heal(amount)
    }

    pub fn is_destroyed(&self) -> bool {
        self.health == 0
    }
}

/// An asteroid
#[derive(Debug, Clone)]
pub struct Hazard {
    pub id: u32,
    pub kind: u8,
    pub size: SizeClass,
    pub radius: f32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub rotation: f32,
    /// Radians per second
    pub spin: f32,
    /// Fixed when spawned
    pub damage: u32,
}

impl Hazard {
    pub fn advance(&mut self, dt: f32) {
        self.pos += self.vel * dt;
        self.rotation = (self.rotation + self.spin * dt).rem_euclid(TAU);
    }

    /// Far enough outside the field that it can never come back into view
    pub fn is_gone(&self, field: &Playfield) -> bool {
        field.is_outside(self.pos, self.radius * 4.0)
    }
}

/// A floating power-up
#[derive(Debug, Clone)]
pub struct Collectible {
    pub id: u32,
    /// Key into the power-up registry
    pub type_id: String,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Overrides the registry `amount` for this instance
    pub param: Option<f32>,
    /// Seconds until it despawns uncollected
    pub ttl: f32,
}

impl Collectible {
    pub fn advance(&mut self, dt: f32) {
        self.pos += self.vel * dt;
        self.ttl -= dt;
    }

    /// Fell past the bottom or drifted off a side. The top edge is where
    /// collectibles enter, so it never culls.
    pub fn is_gone(&self, field: &Playfield) -> bool {
        let r = self.radius;
        self.pos.y - r > field.height + 2.0 * r
            || self.pos.x - r > field.width + 2.0 * r
            || self.pos.x + r < -2.0 * r
    }

    pub fn is_expired(&self) -> bool {
        self.ttl <= 0.0
    }
}

/// A particle for visual effects
#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub palette: u32,
    pub life: f32, // 0-1, decreases over time
    pub size: f32,
}

impl Particle {
    pub fn advance(&mut self, dt: f32) {
        self.pos += self.vel * dt;
        self.vel *= (1.0 - 2.0 * dt).max(0.0);
        self.life -= dt * 1.5;
    }
}

/// Maximum particles
pub const MAX_PARTICLES: usize = 256;

/// Entity id of the ship in draw events; spawned entities start at 1
pub const SHIP_ID: u32 = 0;

/// Particle palettes understood by the renderer
pub const PALETTE_DEBRIS: u32 = 0;
pub const PALETTE_SHIP_HIT: u32 = 1;
pub const PALETTE_BURST: u32 = 2;

/// Complete state of one run
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Only source of gameplay randomness
    pub rng: Pcg32,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub phase: GamePhase,
    pub ship: Ship,
    /// Sorted by id for determinism
    pub hazards: Vec<Hazard>,
    /// Sorted by id for determinism
    pub collectibles: Vec<Collectible>,
    /// Visual particles (not gameplay-affecting)
    pub particles: Vec<Particle>,
    pub effects: TimedEffects,
    pub difficulty: DifficultyState,
    pub spawner: Spawner,
    pub score: u64,
    /// Fractional survival points not yet banked
    score_carry: f32,
    /// Set once, on the tick the run ends
    pub game_over: Option<GameOverReport>,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Fresh run: ship centred at full health, empty field, tier 0
    pub fn new(seed: u64, rules: &Rules) -> Self {
        let tuning = &rules.tuning;
        let mut rng = Pcg32::seed_from_u64(seed);
        let spawner = Spawner::new(tuning, &mut rng);
        Self {
            seed,
            rng,
            time_ticks: 0,
            phase: GamePhase::Playing,
            ship: Ship::new(&tuning.ship, &tuning.playfield),
            hazards: Vec::new(),
            collectibles: Vec::new(),
            particles: Vec::new(),
            effects: TimedEffects::new(tuning.effects.expiring_fraction),
            difficulty: DifficultyState::new(&rules.curve),
            spawner,
            score: 0,
            score_carry: 0.0,
            game_over: None,
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn spawn_hazard(&mut self, spawn: HazardSpawn) -> u32 {
        let id = self.next_entity_id();
        self.hazards.push(Hazard {
            id,
            kind: spawn.kind,
            size: spawn.size,
            radius: spawn.radius,
            pos: spawn.pos,
            vel: spawn.vel,
            rotation: 0.0,
            spin: spawn.spin,
            damage: spawn.damage,
        });
        id
    }

    pub fn spawn_collectible(&mut self, spawn: CollectibleSpawn) -> u32 {
        let id = self.next_entity_id();
        self.collectibles.push(Collectible {
            id,
            type_id: spawn.type_id,
            pos: spawn.pos,
            vel: spawn.vel,
            radius: spawn.radius,
            param: spawn.param,
            ttl: spawn.lifetime,
        });
        id
    }

    /// Remove and return a hazard by id
    pub fn take_hazard(&mut self, id: u32) -> Option<Hazard> {
        let index = self.hazards.iter().position(|h| h.id == id)?;
        Some(self.hazards.remove(index))
    }

    /// Remove and return a collectible by id
    pub fn take_collectible(&mut self, id: u32) -> Option<Collectible> {
        let index = self.collectibles.iter().position(|c| c.id == id)?;
        Some(self.collectibles.remove(index))
    }

    pub fn is_invulnerable(&self) -> bool {
        self.effects.is_active(TimedEffectKind::Invulnerability)
    }

    /// Survival time at which the current grace window ends
    pub fn invulnerable_until(&self) -> Option<f32> {
        self.effects
            .remaining(TimedEffectKind::Invulnerability)
            .map(|left| self.difficulty.elapsed + left)
    }

    pub fn add_score(&mut self, points: u64) {
        self.score += points;
    }

    /// Bank survival points for `dt` seconds, carrying the fraction.
    /// Returns the whole points added.
    pub fn accrue_survival(&mut self, dt: f32, points_per_second: f32) -> u64 {
        self.score_carry += dt.max(0.0) * points_per_second;
        let whole = self.score_carry.floor();
        self.score_carry -= whole;
        let whole = whole as u64;
        self.score += whole;
        whole
    }

    /// Burst of particles at `pos`. Randomness comes from hashing the tick
    /// and `salt` so visuals never consume gameplay RNG.
    pub fn emit_particles(&mut self, pos: Vec2, palette: u32, count: u32, base_speed: f32, salt: u32) {
        let seed = (self.time_ticks as u32)
            .wrapping_mul(2654435761)
            .wrapping_add(salt.wrapping_mul(40503));
        for i in 0..count {
            if self.particles.len() >= MAX_PARTICLES {
                self.particles.remove(0);
            }
            let hash = seed.wrapping_add(i.wrapping_mul(7919)).wrapping_mul(2654435761);
            let angle = (hash % 1000) as f32 / 1000.0 * TAU;
            let speed = base_speed * (0.5 + ((hash >> 10) % 1000) as f32 / 1000.0);
            let size = 2.0 + ((hash >> 20) % 100) as f32 / 100.0 * 3.0;
            self.particles.push(Particle {
                pos,
                vel: Vec2::from_angle(angle) * speed,
                palette,
                life: 1.0,
                size,
            });
        }
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.hazards.sort_by_key(|h| h.id);
        self.collectibles.sort_by_key(|c| c.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;
    use proptest::prelude::*;

    fn rules() -> Rules {
        Rules::new(Tuning::default()).unwrap()
    }

    #[test]
    fn test_new_run_starts_clean() {
        let rules = rules();
        let state = GameState::new(7, &rules);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.ship.health, 100);
        assert_eq!(state.ship.pos, Vec2::new(400.0, 300.0));
        assert!(state.hazards.is_empty());
        assert_eq!(state.difficulty.current.tier, 0);
        assert_eq!(state.score, 0);
        assert!(state.invulnerable_until().is_none());
    }

    #[test]
    fn test_damage_saturates_at_zero() {
        let rules = rules();
        let mut ship = Ship::new(&rules.tuning.ship, &rules.tuning.playfield);
        ship.health = 10;
        assert_eq!(ship.apply_damage(25), 10);
        assert_eq!(ship.health, 0);
        assert!(ship.is_destroyed());
        assert_eq!(ship.apply_damage(5), 0);
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let rules = rules();
        let mut ship = Ship::new(&rules.tuning.ship, &rules.tuning.playfield);
        ship.health = 90;
        assert_eq!(ship.heal_percent(25.0), 10);
        assert_eq!(ship.health, 100);
    }

    #[test]
    fn test_ship_stays_inside_field() {
        let rules = rules();
        let tuning = &rules.tuning;
        let mut ship = Ship::new(&tuning.ship, &tuning.playfield);
        for _ in 0..600 {
            ship.steer(Vec2::new(-1.0, -1.0), 1.0 / 120.0, &tuning.ship, &tuning.playfield);
        }
        assert_eq!(ship.pos, Vec2::splat(tuning.ship.radius));
        assert!(ship.vel.length() <= tuning.ship.max_speed);
    }

    #[test]
    fn test_ship_coasts_to_a_stop() {
        let rules = rules();
        let tuning = &rules.tuning;
        let mut ship = Ship::new(&tuning.ship, &tuning.playfield);
        ship.vel = Vec2::new(300.0, 0.0);
        for _ in 0..120 {
            ship.steer(Vec2::ZERO, 1.0 / 120.0, &tuning.ship, &tuning.playfield);
        }
        assert_eq!(ship.vel, Vec2::ZERO);
    }

    #[test]
    fn test_survival_score_carries_fractions() {
        let rules = rules();
        let mut state = GameState::new(1, &rules);
        let mut banked = 0;
        for _ in 0..120 {
            banked += state.accrue_survival(1.0 / 120.0, 10.0);
        }
        // One second at 10 pts/s; float drift may leave the last point in the carry
        assert!((9..=10).contains(&banked));
        assert_eq!(state.score, banked);
    }

    #[test]
    fn test_particles_capped() {
        let rules = rules();
        let mut state = GameState::new(1, &rules);
        for salt in 0..40 {
            state.emit_particles(Vec2::ZERO, PALETTE_DEBRIS, 10, 100.0, salt);
        }
        assert_eq!(state.particles.len(), MAX_PARTICLES);
    }

    proptest! {
        #[test]
        fn prop_health_stays_in_bounds(
            ops in prop::collection::vec((any::<bool>(), 0u32..200, 0.0f32..150.0), 1..100),
        ) {
            let rules = rules();
            let mut ship = Ship::new(&rules.tuning.ship, &rules.tuning.playfield);
            for (is_hit, damage, percent) in ops {
                if is_hit {
                    ship.apply_damage(damage);
                } else {
                    ship.heal_percent(percent);
                }
                prop_assert!(ship.health <= ship.max_health);
            }
        }
    }

    #[test]
    fn test_collectible_culling_ignores_top_edge() {
        let field = Playfield::default();
        let mut c = Collectible {
            id: 1,
            type_id: "heal".into(),
            pos: Vec2::new(400.0, -200.0),
            vel: Vec2::ZERO,
            radius: 20.0,
            param: None,
            ttl: 1.0,
        };
        assert!(!c.is_gone(&field));
        c.pos.y = 700.0;
        assert!(c.is_gone(&field));
    }
}
