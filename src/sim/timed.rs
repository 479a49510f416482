//! Timed effects
//!
//! Every transient state (grace window, flash overlay, area burst) is an
//! entry here with its own countdown instead of a flag/timer pair on the
//! game state. Entries go Active → Expiring → Removed and are dropped as
//! soon as they reach Removed.

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimedEffectKind {
    /// Ship ignores hazard damage
    Invulnerability,
    /// Red overlay after a hit
    DamageFlash,
    /// Destroys hazards inside its radius every tick it is live
    AreaBurst,
}

impl TimedEffectKind {
    /// Exclusive kinds refresh the existing timer instead of stacking
    pub fn is_exclusive(self) -> bool {
        matches!(self, TimedEffectKind::Invulnerability | TimedEffectKind::DamageFlash)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectStatus {
    Active,
    /// Inside the final `expiring_fraction` of its duration
    Expiring,
    Removed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectParams {
    pub center: Vec2,
    pub radius: f32,
    pub magnitude: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEffect {
    pub id: u32,
    pub kind: TimedEffectKind,
    pub duration: f32,
    pub remaining: f32,
    pub status: EffectStatus,
    pub params: EffectParams,
}

impl TimedEffect {
    /// 1.0 when fresh, 0.0 when spent
    pub fn fraction_left(&self) -> f32 {
        if self.duration > 0.0 {
            (self.remaining / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn is_live(&self) -> bool {
        self.status != EffectStatus::Removed
    }
}

/// All live timed effects of a run
#[derive(Debug, Clone)]
pub struct TimedEffects {
    entries: Vec<TimedEffect>,
    next_id: u32,
    expiring_fraction: f32,
}

impl TimedEffects {
    pub fn new(expiring_fraction: f32) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            expiring_fraction,
        }
    }

    /// Start an effect, or refresh the live one for exclusive kinds.
    /// Returns the id of the live entry, or `None` for a non-positive duration.
    pub fn activate(
        &mut self,
        kind: TimedEffectKind,
        duration: f32,
        params: EffectParams,
    ) -> Option<u32> {
        if !(duration > 0.0) {
            return None;
        }

        if kind.is_exclusive() {
            if let Some(existing) = self.entries.iter_mut().find(|e| e.kind == kind && e.is_live())
            {
                existing.duration = duration;
                existing.remaining = duration;
                existing.status = EffectStatus::Active;
                existing.params = params;
                return Some(existing.id);
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(TimedEffect {
            id,
            kind,
            duration,
            remaining: duration,
            status: EffectStatus::Active,
            params,
        });
        Some(id)
    }

    /// Count every timer down by `dt` and drop the ones that ran out.
    /// Returns the removed entries (status `Removed`).
    pub fn advance(&mut self, dt: f32) -> Vec<TimedEffect> {
        let dt = dt.max(0.0);
        for effect in &mut self.entries {
            effect.remaining -= dt;
            effect.status = if effect.remaining <= 0.0 {
                effect.remaining = 0.0;
                EffectStatus::Removed
            } else if effect.remaining <= effect.duration * self.expiring_fraction {
                EffectStatus::Expiring
            } else {
                EffectStatus::Active
            };
        }

        let mut removed = Vec::new();
        self.entries.retain(|e| {
            if e.is_live() {
                true
            } else {
                removed.push(e.clone());
                false
            }
        });
        removed
    }

    pub fn is_active(&self, kind: TimedEffectKind) -> bool {
        self.of_kind(kind).next().is_some()
    }

    /// Longest remaining time among live effects of `kind`
    pub fn remaining(&self, kind: TimedEffectKind) -> Option<f32> {
        self.of_kind(kind).map(|e| e.remaining).reduce(f32::max)
    }

    pub fn of_kind(&self, kind: TimedEffectKind) -> impl Iterator<Item = &TimedEffect> {
        self.entries.iter().filter(move |e| e.kind == kind && e.is_live())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimedEffect> {
        self.entries.iter().filter(|e| e.is_live())
    }

    pub fn get(&self, id: u32) -> Option<&TimedEffect> {
        self.entries.iter().find(|e| e.id == id && e.is_live())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
