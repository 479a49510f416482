//! Compiled rules
//!
//! [`Tuning`] is plain data. `Rules` validates it once and precomputes the
//! weighted tables and lookups the hot path needs, so a tick never
//! re-derives anything from the raw configuration.

use std::collections::BTreeMap;

use super::difficulty::DifficultyCurve;
use super::effects::HandlerRegistry;
use super::weighted::WeightedTable;
use crate::error::ConfigError;
use crate::tuning::{HazardType, PowerUpType, Rarity, Tuning};

#[derive(Debug)]
pub struct Rules {
    pub tuning: Tuning,
    pub curve: DifficultyCurve,
    /// One table per difficulty tier, over indices into `tuning.hazards.types`
    hazard_tables: Vec<WeightedTable<usize>>,
    rarity_table: WeightedTable<Rarity>,
    /// Indices into `tuning.collectibles.types`
    powerups_by_rarity: BTreeMap<Rarity, Vec<usize>>,
    handlers: HandlerRegistry,
}

impl Rules {
    pub fn new(tuning: Tuning) -> Result<Self, ConfigError> {
        Self::with_handlers(tuning, HandlerRegistry::with_builtin())
    }

    pub fn with_handlers(tuning: Tuning, handlers: HandlerRegistry) -> Result<Self, ConfigError> {
        tuning.validate()?;

        for ty in &tuning.collectibles.types {
            if handlers.get(&ty.handler).is_none() {
                return Err(ConfigError::UnknownHandler {
                    type_id: ty.id.clone(),
                    handler: ty.handler.clone(),
                });
            }
        }

        let hazard_tables = tuning
            .difficulty
            .iter()
            .map(|tier| {
                WeightedTable::new(
                    "hazard types",
                    tuning.hazards.types.iter().enumerate().map(|(index, ty)| {
                        let boost = tier.weight_overrides.get(&ty.kind).copied().unwrap_or(1.0);
                        (index, ty.weight * boost)
                    }),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rarity_table = WeightedTable::new(
            "collectible rarity",
            tuning
                .collectibles
                .rarity_weights
                .iter()
                .map(|(&rarity, &weight)| (rarity, weight)),
        )?;

        let mut powerups_by_rarity: BTreeMap<Rarity, Vec<usize>> = BTreeMap::new();
        for (index, ty) in tuning.collectibles.types.iter().enumerate() {
            powerups_by_rarity.entry(ty.rarity).or_default().push(index);
        }

        log::info!(
            "Rules ready: {} hazard types over {} tiers, power-ups {:?}, handlers {:?}",
            tuning.hazards.types.len(),
            hazard_tables.len(),
            powerups_by_rarity
                .iter()
                .map(|(rarity, ids)| (*rarity, ids.len()))
                .collect::<Vec<_>>(),
            handlers.names().collect::<Vec<_>>()
        );

        Ok(Self {
            curve: DifficultyCurve::new(tuning.difficulty.clone()),
            tuning,
            hazard_tables,
            rarity_table,
            powerups_by_rarity,
            handlers,
        })
    }

    /// Hazard table for a difficulty tier; tiers past the end use the last table
    pub fn hazard_table(&self, tier: usize) -> &WeightedTable<usize> {
        &self.hazard_tables[tier.min(self.hazard_tables.len() - 1)]
    }

    pub fn hazard_type(&self, index: usize) -> &HazardType {
        &self.tuning.hazards.types[index]
    }

    pub fn rarity_table(&self) -> &WeightedTable<Rarity> {
        &self.rarity_table
    }

    /// Power-up type indices registered under `rarity`
    pub fn powerups_of(&self, rarity: Rarity) -> &[usize] {
        self.powerups_by_rarity
            .get(&rarity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn powerup_at(&self, index: usize) -> &PowerUpType {
        &self.tuning.collectibles.types[index]
    }

    pub fn powerup(&self, id: &str) -> Option<&PowerUpType> {
        self.tuning.collectibles.types.iter().find(|t| t.id == id)
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }
}
