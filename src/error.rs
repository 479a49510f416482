//! Error types
//!
//! Configuration problems are fatal and surface before the first tick.
//! Presentation failures belong to collaborators and never stop the loop.

use std::path::PathBuf;

use thiserror::Error;

/// Invalid or unreadable tuning data, detected when building [`crate::sim::Rules`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read tuning file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tuning: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("weight table `{0}` has no entry with positive weight")]
    EmptyWeights(&'static str),

    #[error("negative or non-finite weight in table `{table}`")]
    InvalidWeight { table: &'static str },

    #[error("rarity tier {0:?} has positive weight but no registered power-up types")]
    EmptyRarityTier(crate::tuning::Rarity),

    #[error("power-up type `{type_id}` uses unregistered handler `{handler}`")]
    UnknownHandler { type_id: String, handler: String },

    #[error("duplicate power-up type `{0}`")]
    DuplicatePowerUp(String),

    #[error("hazard kind {0} has no permitted size classes")]
    NoPermittedSizes(u8),

    #[error("hazard kind {0} is listed more than once")]
    DuplicateHazardKind(u8),

    #[error("weight override references unknown hazard kind {0}")]
    UnknownHazardKind(u8),

    #[error("difficulty curve is invalid: {0}")]
    Difficulty(String),

    #[error("area burst radius factor {0} must exceed 0.5 of the playfield's shorter side")]
    BurstRadiusTooSmall(f32),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Failure reported by a rendering or audio collaborator.
#[derive(Debug, Error)]
#[error("presentation failed: {0}")]
pub struct PresentError(pub String);
