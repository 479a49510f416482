//! Effect engine
//!
//! Turns a [`CollisionReport`] into consequences: hull damage, pickups,
//! area-burst kills, timed effects and presentation events. Power-up
//! behaviour is looked up by handler name so new kinds plug in through
//! [`HandlerRegistry::register`] without touching the dispatch below.

use std::collections::BTreeMap;
use std::fmt;

use super::collision::CollisionReport;
use super::events::{EventBatch, RemoveReason, SoundCue};
use super::rules::Rules;
use super::state::{GameState, PALETTE_BURST, PALETTE_DEBRIS, PALETTE_SHIP_HIT, Ship};
use super::timed::{EffectParams, TimedEffectKind, TimedEffects};
use crate::tuning::{PowerUpParams, Tuning};

/// Mutable world access handed to a power-up handler for one pickup
pub struct EffectContext<'a> {
    pub effects: &'a mut TimedEffects,
    pub events: &'a mut EventBatch,
    pub tuning: &'a Tuning,
}

/// Behaviour of a power-up kind
pub trait PowerUpHandler: Send + Sync {
    fn apply(&self, ship: &mut Ship, params: &PowerUpParams, ctx: &mut EffectContext<'_>);

    /// Text drawn over the collectible, if any
    fn label(&self, _params: &PowerUpParams) -> Option<String> {
        None
    }
}

/// Restores `amount` percent of max health, clamped to max
#[derive(Debug, Clone, Copy, Default)]
pub struct Heal;

impl Heal {
    pub const DEFAULT_PERCENT: f32 = 25.0;
}

impl PowerUpHandler for Heal {
    fn apply(&self, ship: &mut Ship, params: &PowerUpParams, ctx: &mut EffectContext<'_>) {
        let percent = params.amount.unwrap_or(Self::DEFAULT_PERCENT);
        let healed = ship.heal_percent(percent);
        log::debug!("Heal {percent}%: +{healed} -> {}/{}", ship.health, ship.max_health);
        ctx.events.play(SoundCue::Heal, None, 0.0);
    }

    fn label(&self, params: &PowerUpParams) -> Option<String> {
        Some(format!("+{}%", params.amount.unwrap_or(Self::DEFAULT_PERCENT).round()))
    }
}

/// Grants invulnerability for `duration` seconds
#[derive(Debug, Clone, Copy, Default)]
pub struct Shield;

impl PowerUpHandler for Shield {
    fn apply(&self, ship: &mut Ship, params: &PowerUpParams, ctx: &mut EffectContext<'_>) {
        let duration = params.duration.unwrap_or(ctx.tuning.effects.shield_secs);
        ctx.effects.activate(
            TimedEffectKind::Invulnerability,
            duration,
            EffectParams {
                center: ship.pos,
                radius: ship.radius,
                magnitude: 0.0,
            },
        );
        ctx.events.play(SoundCue::Shield, None, 0.0);
    }

    fn label(&self, _params: &PowerUpParams) -> Option<String> {
        Some("SHIELD".into())
    }
}

/// "Boom": a screen-wide blast centred on the ship. Hazards inside the
/// radius are destroyed on every following tick while the blast is live.
#[derive(Debug, Clone, Copy, Default)]
pub struct AreaBurst;

impl PowerUpHandler for AreaBurst {
    fn apply(&self, ship: &mut Ship, params: &PowerUpParams, ctx: &mut EffectContext<'_>) {
        let effects = &ctx.tuning.effects;
        let radius = effects.burst_radius_factor * ctx.tuning.playfield.shorter_side();
        let duration = params.duration.unwrap_or(effects.burst_secs);
        let id = ctx.effects.activate(
            TimedEffectKind::AreaBurst,
            duration,
            EffectParams {
                center: ship.pos,
                radius,
                magnitude: effects.burst_bonus as f32,
            },
        );
        log::debug!("Area burst {id:?} at {} (r={radius})", ship.pos);
        for staged in &effects.burst_cues {
            ctx.events.play(staged.cue, staged.volume, staged.delay);
        }
    }

    fn label(&self, _params: &PowerUpParams) -> Option<String> {
        Some("BOOM".into())
    }
}

/// Handler name → behaviour
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Box<dyn PowerUpHandler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `heal`, `shield` and `area_burst`
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("heal", Heal);
        registry.register("shield", Shield);
        registry.register("area_burst", AreaBurst);
        registry
    }

    /// Add or replace a handler. Returns the replaced one.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl PowerUpHandler + 'static,
    ) -> Option<Box<dyn PowerUpHandler>> {
        self.handlers.insert(name.into(), Box::new(handler))
    }

    pub fn get(&self, name: &str) -> Option<&dyn PowerUpHandler> {
        self.handlers.get(name).map(|h| h.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

/// What the engine did this tick, for the score/game-over stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectOutcome {
    pub score_delta: u64,
    pub damage_taken: u32,
    pub hazards_destroyed: usize,
    pub pickups: usize,
    /// Kind of the hazard that took the hull to zero
    pub fatal_hazard: Option<u8>,
}

/// Apply one tick's collisions. The report was computed against the
/// pre-mutation snapshot, so every id in it refers to a live entity.
pub fn apply(
    report: &CollisionReport,
    state: &mut GameState,
    rules: &Rules,
    events: &mut EventBatch,
) -> EffectOutcome {
    let tuning = &rules.tuning;
    let mut outcome = EffectOutcome::default();

    // Snapshot: a hit earlier in this tick must not shield later hits
    let invulnerable = state.effects.is_active(TimedEffectKind::Invulnerability);

    for (index, kill) in report.burst_kills.iter().enumerate() {
        let Some(hazard) = state.take_hazard(kill.hazard_id) else {
            continue;
        };
        outcome.hazards_destroyed += 1;
        outcome.score_delta += tuning.effects.burst_bonus;
        events.remove(hazard.id, RemoveReason::BurstDestroyed);
        events.play(
            SoundCue::AsteroidExplode,
            None,
            index as f32 * tuning.effects.burst_kill_cue_spacing,
        );
        state.emit_particles(hazard.pos, PALETTE_BURST, 12, 160.0, hazard.id);
    }

    for &hazard_id in &report.ship_hazards {
        let Some(hazard) = state.take_hazard(hazard_id) else {
            continue;
        };
        outcome.hazards_destroyed += 1;
        events.remove(hazard.id, RemoveReason::Collided);

        if invulnerable {
            state.emit_particles(hazard.pos, PALETTE_DEBRIS, 6, 90.0, hazard.id);
            events.play(SoundCue::AsteroidExplode, Some(0.5), 0.0);
            continue;
        }

        let was_alive = !state.ship.is_destroyed();
        let dealt = state.ship.apply_damage(hazard.damage);
        outcome.damage_taken += dealt;
        log::debug!(
            "Hit by hazard {} (kind {}, {}): -{dealt} -> {}",
            hazard.id,
            hazard.kind,
            hazard.size.as_str(),
            state.ship.health
        );

        state.effects.activate(
            TimedEffectKind::Invulnerability,
            tuning.ship.invulnerability_secs,
            EffectParams {
                center: state.ship.pos,
                radius: state.ship.radius,
                magnitude: 0.0,
            },
        );
        state.effects.activate(
            TimedEffectKind::DamageFlash,
            tuning.effects.damage_flash_secs,
            EffectParams {
                center: hazard.pos,
                radius: hazard.radius,
                magnitude: dealt as f32,
            },
        );
        state.emit_particles(hazard.pos, PALETTE_SHIP_HIT, 10, 120.0, hazard.id);
        events.play(SoundCue::ShipHit, None, 0.0);

        if was_alive && state.ship.is_destroyed() && outcome.fatal_hazard.is_none() {
            outcome.fatal_hazard = Some(hazard.kind);
        }
    }

    for &collectible_id in &report.ship_collectibles {
        // A destroyed hull collects nothing
        if state.ship.is_destroyed() {
            break;
        }
        let Some(collectible) = state.take_collectible(collectible_id) else {
            continue;
        };
        events.remove(collectible.id, RemoveReason::Collected);
        events.play(SoundCue::PowerUpCollect, None, 0.0);
        outcome.pickups += 1;

        let Some(kind) = rules.powerup(&collectible.type_id) else {
            log::warn!("Collected unregistered power-up `{}`", collectible.type_id);
            continue;
        };
        let Some(handler) = rules.handlers().get(&kind.handler) else {
            log::warn!("No handler `{}` for power-up `{}`", kind.handler, kind.id);
            continue;
        };

        let params = PowerUpParams {
            amount: collectible.param.or(kind.params.amount),
            duration: kind.params.duration,
        };
        log::debug!("Collected {} ({})", kind.id, kind.handler);
        let mut ctx = EffectContext {
            effects: &mut state.effects,
            events: &mut *events,
            tuning,
        };
        handler.apply(&mut state.ship, &params, &mut ctx);
    }

    outcome
}
