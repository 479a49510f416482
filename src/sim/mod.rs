//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or platform dependencies

pub mod collision;
pub mod difficulty;
pub mod effects;
pub mod events;
pub mod game_loop;
pub mod rules;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod timed;
pub mod weighted;

pub use collision::{BurstKill, CollisionReport, resolve};
pub use difficulty::{Difficulty, DifficultyCurve, DifficultyState};
pub use effects::{AreaBurst, EffectContext, EffectOutcome, HandlerRegistry, Heal, PowerUpHandler, Shield};
pub use events::{
    AudioEvent, DrawKind, EventBatch, GameOverReason, GameOverReport, RemoveReason, RenderEvent,
    SoundCue,
};
pub use game_loop::{GameLoop, Presenter};
pub use rules::Rules;
pub use spawner::{Population, SpawnEvent, Spawner};
pub use state::{Collectible, GamePhase, GameState, Hazard, MAX_PARTICLES, Particle, Ship};
pub use tick::{TickInput, tick};
pub use timed::{EffectParams, EffectStatus, TimedEffect, TimedEffectKind, TimedEffects};
pub use weighted::WeightedTable;
