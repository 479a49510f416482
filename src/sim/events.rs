//! Presentation events
//!
//! The simulation never draws or plays anything. Each tick it fills an
//! [`EventBatch`] that rendering and audio collaborators consume once.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::GamePhase;
use crate::tuning::SizeClass;

/// Sound identifiers understood by the audio collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    ShipHit,
    PowerUpCollect,
    Heal,
    Shield,
    ExplosionMain,
    ExplosionRumble,
    AsteroidExplode,
    GameOver,
}

/// One queued sound
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioEvent {
    pub cue: SoundCue,
    pub volume: Option<f32>,
    /// Seconds after the tick this was queued on
    pub delay: f32,
}

/// What an entity draw intent depicts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawKind {
    Ship { invulnerable: bool },
    Hazard { kind: u8, size: SizeClass },
    Collectible { type_id: String },
}

/// Why an entity left the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoveReason {
    /// Hazard that hit the ship
    Collided,
    /// Collectible picked up
    Collected,
    /// Hazard caught by an area burst
    BurstDestroyed,
    OutOfBounds,
    /// Collectible lifetime ran out
    Expired,
}

/// Render intents, in the order they should be applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderEvent {
    Draw {
        entity_id: u32,
        kind: DrawKind,
        pos: Vec2,
        rotation: f32,
        scale: f32,
        overlay_text: Option<String>,
    },
    /// Terminal event for a destroyed entity
    Remove { entity_id: u32, reason: RemoveReason },
    /// Visual-only particle, not an entity
    Particle {
        pos: Vec2,
        size: f32,
        alpha: f32,
        palette: u32,
    },
    ScreenFlash { color: [u8; 3], alpha: f32 },
    HealthBar { value: u32, max: u32 },
    Score { value: u64 },
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    /// Hull reached zero health; carries the kind of the finishing hazard
    HullDestroyed { hazard_kind: u8 },
}

/// Terminal report, emitted exactly once per run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameOverReport {
    pub final_score: u64,
    pub reason: GameOverReason,
    pub survived_secs: f32,
}

/// Everything one tick produced for the outside world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    pub tick: u64,
    pub phase: GamePhase,
    pub render: Vec<RenderEvent>,
    pub audio: Vec<AudioEvent>,
    pub game_over: Option<GameOverReport>,
}

impl EventBatch {
    pub fn new(tick: u64, phase: GamePhase) -> Self {
        Self {
            tick,
            phase,
            render: Vec::new(),
            audio: Vec::new(),
            game_over: None,
        }
    }

    pub fn play(&mut self, cue: SoundCue, volume: Option<f32>, delay: f32) {
        self.audio.push(AudioEvent { cue, volume, delay });
    }

    pub fn remove(&mut self, entity_id: u32, reason: RemoveReason) {
        self.render.push(RenderEvent::Remove { entity_id, reason });
    }

    /// Entity ids removed this tick, in event order
    pub fn removed_ids(&self) -> impl Iterator<Item = (u32, RemoveReason)> + '_ {
        self.render.iter().filter_map(|e| match *e {
            RenderEvent::Remove { entity_id, reason } => Some((entity_id, reason)),
            _ => None,
        })
    }

    /// Entity ids drawn this tick, in event order
    pub fn drawn_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.render.iter().filter_map(|e| match e {
            RenderEvent::Draw { entity_id, .. } => Some(*entity_id),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.render.is_empty() && self.audio.is_empty() && self.game_over.is_none()
    }
}
