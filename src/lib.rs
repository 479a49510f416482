//! Asteroid Navigator - arcade survival among falling asteroids
//!
//! Core modules:
//! - `sim`: Deterministic simulation (spawning, collisions, effects, game state)
//! - `tuning`: Data-driven game balance
//! - `error`: Configuration and presentation errors

pub mod error;
pub mod sim;
pub mod tuning;

pub use error::{ConfigError, PresentError};
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame delta the loop will try to catch up on
    pub const MAX_FRAME_DT: f32 = 0.1;
}
