//! Difficulty progression
//!
//! Danger is a step function of survival time. The curve is pure; the
//! per-run [`DifficultyState`] just tracks elapsed time and re-queries it.

use serde::{Deserialize, Serialize};

use crate::tuning::DifficultyTier;

/// Multipliers in force for one tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    /// Index into the tier list; also selects the hazard weight table
    pub tier: usize,
    pub spawn_interval_multiplier: f32,
    pub speed_multiplier: f32,
    pub damage_multiplier: f32,
}

/// Fixed tier thresholds, validated to grow strictly more dangerous
#[derive(Debug, Clone)]
pub struct DifficultyCurve {
    tiers: Vec<DifficultyTier>,
}

impl DifficultyCurve {
    /// `tiers` must be non-empty and start at 0 (see [`crate::tuning::Tuning::validate`])
    pub fn new(tiers: Vec<DifficultyTier>) -> Self {
        Self { tiers }
    }

    pub fn tiers(&self) -> &[DifficultyTier] {
        &self.tiers
    }

    pub fn tier_index(&self, elapsed: f32) -> usize {
        self.tiers
            .partition_point(|t| t.starts_at <= elapsed)
            .saturating_sub(1)
    }

    /// Multipliers at `elapsed` seconds of survival
    pub fn at(&self, elapsed: f32) -> Difficulty {
        let tier = self.tier_index(elapsed);
        let config = &self.tiers[tier];
        Difficulty {
            tier,
            spawn_interval_multiplier: config.spawn_interval_multiplier,
            speed_multiplier: config.speed_multiplier,
            damage_multiplier: config.damage_multiplier,
        }
    }
}

/// Survival clock of the current run
#[derive(Debug, Clone)]
pub struct DifficultyState {
    pub elapsed: f32,
    pub current: Difficulty,
}

impl DifficultyState {
    pub fn new(curve: &DifficultyCurve) -> Self {
        Self {
            elapsed: 0.0,
            current: curve.at(0.0),
        }
    }

    /// Advance the clock and re-query the curve. Returns the new tier index
    /// when a boundary was crossed.
    pub fn advance(&mut self, dt: f32, curve: &DifficultyCurve) -> Option<usize> {
        self.elapsed += dt.max(0.0);
        let previous = self.current.tier;
        self.current = curve.at(self.elapsed);
        (self.current.tier != previous).then_some(self.current.tier)
    }
}
