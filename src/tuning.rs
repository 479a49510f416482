//! Data-driven game balance
//!
//! Every number the simulation balances against lives here so it can be
//! overridden from a JSON file without touching the rules. Missing fields
//! fall back to the defaults below.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::events::SoundCue;

/// Collectible rarity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
}

impl Rarity {
    pub const ALL: [Rarity; 3] = [Rarity::Common, Rarity::Uncommon, Rarity::Rare];
}

/// Hazard size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeClass::Small => "small",
            SizeClass::Medium => "medium",
            SizeClass::Large => "large",
        }
    }
}

/// Visible play area, origin top-left, y pointing down
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Playfield {
    pub width: f32,
    pub height: f32,
}

impl Default for Playfield {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

impl Playfield {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn center(&self) -> Vec2 {
        self.size() * 0.5
    }

    pub fn shorter_side(&self) -> f32 {
        self.width.min(self.height)
    }

    /// True if a circle at `pos` is completely outside the field grown by `margin`
    pub fn is_outside(&self, pos: Vec2, margin: f32) -> bool {
        pos.x < -margin
            || pos.x > self.width + margin
            || pos.y < -margin
            || pos.y > self.height + margin
    }
}

/// Player ship handling and durability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipTuning {
    /// Collision radius in pixels
    pub radius: f32,
    /// Top speed in pixels per second
    pub max_speed: f32,
    /// Pixels/s² while steering
    pub acceleration: f32,
    /// Pixels/s² while coasting
    pub deceleration: f32,
    pub max_health: u32,
    /// Post-damage grace window
    pub invulnerability_secs: f32,
}

impl Default for ShipTuning {
    fn default() -> Self {
        Self {
            radius: 30.0,
            max_speed: 300.0,
            acceleration: 1200.0,
            deceleration: 900.0,
            max_health: 100,
            invulnerability_secs: 1.0,
        }
    }
}

/// Geometry and multipliers for one size class
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SizeSpec {
    /// Diameter range in pixels
    pub min_size: f32,
    pub max_size: f32,
    /// Smaller rocks fly faster
    pub speed_multiplier: f32,
    /// Bigger rocks hit harder
    pub damage_multiplier: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeTable {
    pub small: SizeSpec,
    pub medium: SizeSpec,
    pub large: SizeSpec,
}

impl Default for SizeTable {
    fn default() -> Self {
        Self {
            small: SizeSpec {
                min_size: 15.0,
                max_size: 25.0,
                speed_multiplier: 1.4,
                damage_multiplier: 1.0,
            },
            medium: SizeSpec {
                min_size: 26.0,
                max_size: 40.0,
                speed_multiplier: 1.0,
                damage_multiplier: 1.5,
            },
            large: SizeSpec {
                min_size: 41.0,
                max_size: 60.0,
                speed_multiplier: 0.7,
                damage_multiplier: 2.0,
            },
        }
    }
}

impl SizeTable {
    pub fn get(&self, size: SizeClass) -> &SizeSpec {
        match size {
            SizeClass::Small => &self.small,
            SizeClass::Medium => &self.medium,
            SizeClass::Large => &self.large,
        }
    }
}

/// One asteroid type. Higher `kind` means more dangerous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardType {
    pub kind: u8,
    pub weight: f32,
    pub base_damage: u32,
    pub sizes: Vec<SizeClass>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardTuning {
    pub types: Vec<HazardType>,
    pub sizes: SizeTable,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Average seconds between spawns at tier 0
    pub spawn_interval: f32,
    /// Each interval is `spawn_interval * uniform(jitter_min, jitter_max)`
    pub jitter_min: f32,
    pub jitter_max: f32,
    /// Spawning holds while this many hazards are alive
    pub max_alive: usize,
    /// Half-extent of the aim box around the playfield centre
    pub aim_spread: Vec2,
    /// Max spin in degrees per second (either direction)
    pub max_spin_deg: f32,
}

impl Default for HazardTuning {
    fn default() -> Self {
        use SizeClass::*;
        let table: [(u8, f32, u32, &[SizeClass]); 7] = [
            (0, 25.0, 5, &[Small, Medium, Large]),
            (1, 20.0, 10, &[Small, Medium, Large]),
            (2, 15.0, 15, &[Small, Medium, Large]),
            (3, 10.0, 25, &[Small, Medium]),
            (4, 7.0, 35, &[Small, Medium]),
            (5, 4.0, 50, &[Small]),
            (6, 2.0, 80, &[Small]),
        ];
        Self {
            types: table
                .iter()
                .map(|&(kind, weight, base_damage, sizes)| HazardType {
                    kind,
                    weight,
                    base_damage,
                    sizes: sizes.to_vec(),
                })
                .collect(),
            sizes: SizeTable::default(),
            min_speed: 50.0,
            max_speed: 200.0,
            spawn_interval: 0.5,
            jitter_min: 0.5,
            jitter_max: 1.5,
            max_alive: 40,
            aim_spread: Vec2::new(200.0, 150.0),
            max_spin_deg: 50.0,
        }
    }
}

/// Optional numeric knobs passed to a power-up handler
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpParams {
    /// Handler-specific magnitude (heal percentage, ...)
    pub amount: Option<f32>,
    /// Handler-specific duration in seconds
    pub duration: Option<f32>,
}

/// Registry entry: type id → rarity, handler and parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUpType {
    pub id: String,
    pub rarity: Rarity,
    /// Name of the handler registered in [`crate::sim::effects::HandlerRegistry`]
    pub handler: String,
    #[serde(default)]
    pub params: PowerUpParams,
}

impl PowerUpType {
    fn new(id: &str, rarity: Rarity, handler: &str, params: PowerUpParams) -> Self {
        Self {
            id: id.to_string(),
            rarity,
            handler: handler.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectibleTuning {
    pub rarity_weights: BTreeMap<Rarity, f32>,
    pub types: Vec<PowerUpType>,
    pub spawn_interval: f32,
    pub jitter_min: f32,
    pub jitter_max: f32,
    pub max_alive: usize,
    pub radius: f32,
    /// Horizontal drift is uniform in `[-drift_x, drift_x]`
    pub drift_x: f32,
    pub min_fall_speed: f32,
    pub max_fall_speed: f32,
    pub lifetime_secs: f32,
}

impl Default for CollectibleTuning {
    fn default() -> Self {
        let heal = |pct: f32| PowerUpParams {
            amount: Some(pct),
            duration: None,
        };
        Self {
            rarity_weights: BTreeMap::from([
                (Rarity::Common, 70.0),
                (Rarity::Uncommon, 25.0),
                (Rarity::Rare, 5.0),
            ]),
            types: vec![
                PowerUpType::new("heal_minor", Rarity::Common, "heal", heal(10.0)),
                PowerUpType::new("heal", Rarity::Common, "heal", heal(25.0)),
                PowerUpType::new("heal_major", Rarity::Uncommon, "heal", heal(50.0)),
                PowerUpType::new(
                    "shield",
                    Rarity::Uncommon,
                    "shield",
                    PowerUpParams {
                        amount: None,
                        duration: Some(5.0),
                    },
                ),
                PowerUpType::new("boom", Rarity::Rare, "area_burst", PowerUpParams::default()),
            ],
            spawn_interval: 6.0,
            jitter_min: 0.5,
            jitter_max: 1.5,
            max_alive: 3,
            radius: 20.0,
            drift_x: 20.0,
            min_fall_speed: 20.0,
            max_fall_speed: 50.0,
            lifetime_secs: 20.0,
        }
    }
}

/// A difficulty tier, active from `starts_at` seconds until the next tier starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultyTier {
    pub starts_at: f32,
    pub spawn_interval_multiplier: f32,
    pub speed_multiplier: f32,
    pub damage_multiplier: f32,
    /// Hazard kind → weight multiplier, re-normalized with the base weights
    #[serde(default)]
    pub weight_overrides: BTreeMap<u8, f32>,
}

impl DifficultyTier {
    fn new(starts_at: f32, interval: f32, speed: f32, damage: f32, overrides: &[(u8, f32)]) -> Self {
        Self {
            starts_at,
            spawn_interval_multiplier: interval,
            speed_multiplier: speed,
            damage_multiplier: damage,
            weight_overrides: overrides.iter().copied().collect(),
        }
    }
}

pub fn default_difficulty_tiers() -> Vec<DifficultyTier> {
    vec![
        DifficultyTier::new(0.0, 1.0, 1.0, 1.0, &[]),
        DifficultyTier::new(30.0, 0.85, 1.1, 1.1, &[(3, 1.25), (4, 1.25), (5, 1.25), (6, 1.25)]),
        DifficultyTier::new(60.0, 0.7, 1.2, 1.2, &[(3, 1.5), (4, 1.5), (5, 1.5), (6, 1.5)]),
        DifficultyTier::new(90.0, 0.6, 1.3, 1.35, &[(3, 1.75), (4, 1.75), (5, 2.0), (6, 2.0)]),
        DifficultyTier::new(
            120.0,
            0.5,
            1.4,
            1.5,
            &[(2, 1.25), (3, 2.0), (4, 2.0), (5, 2.5), (6, 2.5)],
        ),
        DifficultyTier::new(
            180.0,
            0.4,
            1.5,
            1.75,
            &[(0, 0.75), (2, 1.5), (3, 2.5), (4, 2.5), (5, 3.0), (6, 3.0)],
        ),
    ]
}

/// Audio cue with a delay relative to the tick it was queued on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StagedCue {
    pub cue: SoundCue,
    #[serde(default)]
    pub volume: Option<f32>,
    #[serde(default)]
    pub delay: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectTuning {
    /// Red overlay after taking damage
    pub damage_flash_secs: f32,
    /// White overlay and active window of an area burst
    pub burst_secs: f32,
    /// Burst radius as a fraction of the playfield's shorter side
    pub burst_radius_factor: f32,
    /// Score per hazard destroyed by a burst
    pub burst_bonus: u64,
    /// Default duration for the shield handler
    pub shield_secs: f32,
    /// Fraction of the duration after which an effect reports Expiring
    pub expiring_fraction: f32,
    /// Cues queued when a burst goes off
    pub burst_cues: Vec<StagedCue>,
    /// Spacing between per-hazard explosion cues
    pub burst_kill_cue_spacing: f32,
}

impl Default for EffectTuning {
    fn default() -> Self {
        Self {
            damage_flash_secs: 0.25,
            burst_secs: 0.5,
            burst_radius_factor: 0.75,
            burst_bonus: 50,
            shield_secs: 5.0,
            expiring_fraction: 0.25,
            burst_cues: vec![
                StagedCue {
                    cue: SoundCue::PowerUpCollect,
                    volume: Some(0.9),
                    delay: 0.0,
                },
                StagedCue {
                    cue: SoundCue::ExplosionMain,
                    volume: Some(0.8),
                    delay: 0.1,
                },
                StagedCue {
                    cue: SoundCue::ExplosionRumble,
                    volume: Some(0.6),
                    delay: 0.6,
                },
            ],
            burst_kill_cue_spacing: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTuning {
    pub survival_points_per_second: f32,
}

impl Default for ScoreTuning {
    fn default() -> Self {
        Self {
            survival_points_per_second: 10.0,
        }
    }
}

/// Complete balance sheet, read-only once a run starts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub playfield: Playfield,
    pub ship: ShipTuning,
    pub hazards: HazardTuning,
    pub collectibles: CollectibleTuning,
    pub difficulty: Vec<DifficultyTier>,
    pub effects: EffectTuning,
    pub score: ScoreTuning,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            playfield: Playfield::default(),
            ship: ShipTuning::default(),
            hazards: HazardTuning::default(),
            collectibles: CollectibleTuning::default(),
            difficulty: default_difficulty_tiers(),
            effects: EffectTuning::default(),
            score: ScoreTuning::default(),
        }
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("{value} is not a positive number"),
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("{value} is negative or not finite"),
        })
    }
}

fn ordered_range(field: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    if min.is_finite() && max.is_finite() && min >= 0.0 && min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("range {min}..{max} is not ordered"),
        })
    }
}

impl Tuning {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        log::info!(
            "Parsed tuning: {} hazard types, {} power-up types, {} difficulty tiers",
            tuning.hazards.types.len(),
            tuning.collectibles.types.len(),
            tuning.difficulty.len()
        );
        Ok(tuning)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Structural checks that need nothing but the data itself.
    /// Handler names are checked later against the handler registry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("playfield.width", self.playfield.width)?;
        positive("playfield.height", self.playfield.height)?;

        positive("ship.radius", self.ship.radius)?;
        positive("ship.max_speed", self.ship.max_speed)?;
        positive("ship.acceleration", self.ship.acceleration)?;
        positive("ship.deceleration", self.ship.deceleration)?;
        if self.ship.max_health == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ship.max_health",
                reason: "must be at least 1".into(),
            });
        }

        let hazards = &self.hazards;
        positive("hazards.spawn_interval", hazards.spawn_interval)?;
        ordered_range("hazards.jitter", hazards.jitter_min, hazards.jitter_max)?;
        ordered_range("hazards.speed", hazards.min_speed, hazards.max_speed)?;
        non_negative("hazards.aim_spread.x", hazards.aim_spread.x)?;
        non_negative("hazards.aim_spread.y", hazards.aim_spread.y)?;
        non_negative("hazards.max_spin_deg", hazards.max_spin_deg)?;
        for size in [SizeClass::Small, SizeClass::Medium, SizeClass::Large] {
            let spec = hazards.sizes.get(size);
            ordered_range("hazards.sizes", spec.min_size, spec.max_size)?;
        }
        let mut kinds = HashSet::new();
        for ty in &hazards.types {
            if !kinds.insert(ty.kind) {
                return Err(ConfigError::DuplicateHazardKind(ty.kind));
            }
            if ty.sizes.is_empty() {
                return Err(ConfigError::NoPermittedSizes(ty.kind));
            }
        }

        let collectibles = &self.collectibles;
        positive("collectibles.spawn_interval", collectibles.spawn_interval)?;
        positive("collectibles.radius", collectibles.radius)?;
        positive("collectibles.lifetime_secs", collectibles.lifetime_secs)?;
        ordered_range("collectibles.jitter", collectibles.jitter_min, collectibles.jitter_max)?;
        non_negative("collectibles.drift_x", collectibles.drift_x.abs())?;
        ordered_range(
            "collectibles.fall_speed",
            collectibles.min_fall_speed,
            collectibles.max_fall_speed,
        )?;
        let mut ids = HashSet::new();
        for ty in &collectibles.types {
            if !ids.insert(ty.id.as_str()) {
                return Err(ConfigError::DuplicatePowerUp(ty.id.clone()));
            }
        }
        for (&rarity, &weight) in &collectibles.rarity_weights {
            if weight > 0.0 && !collectibles.types.iter().any(|t| t.rarity == rarity) {
                return Err(ConfigError::EmptyRarityTier(rarity));
            }
        }

        self.validate_difficulty(&kinds)?;

        if !(self.effects.burst_radius_factor > 0.5) {
            return Err(ConfigError::BurstRadiusTooSmall(self.effects.burst_radius_factor));
        }
        positive("effects.burst_secs", self.effects.burst_secs)?;
        positive("effects.damage_flash_secs", self.effects.damage_flash_secs)?;
        if !(0.0..1.0).contains(&self.effects.expiring_fraction) {
            return Err(ConfigError::InvalidValue {
                field: "effects.expiring_fraction",
                reason: "must be in [0, 1)".into(),
            });
        }

        Ok(())
    }

    fn validate_difficulty(&self, kinds: &HashSet<u8>) -> Result<(), ConfigError> {
        let tiers = &self.difficulty;
        let Some(first) = tiers.first() else {
            return Err(ConfigError::Difficulty("no tiers defined".into()));
        };
        if first.starts_at != 0.0 {
            return Err(ConfigError::Difficulty("first tier must start at 0".into()));
        }
        for tier in tiers {
            positive("difficulty.spawn_interval_multiplier", tier.spawn_interval_multiplier)?;
            positive("difficulty.speed_multiplier", tier.speed_multiplier)?;
            positive("difficulty.damage_multiplier", tier.damage_multiplier)?;
            if let Some(kind) = tier.weight_overrides.keys().find(|k| !kinds.contains(*k)) {
                return Err(ConfigError::UnknownHazardKind(*kind));
            }
        }
        for (index, pair) in tiers.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.starts_at <= prev.starts_at {
                return Err(ConfigError::Difficulty(format!(
                    "tier {} starts at {} which is not after {}",
                    index + 1,
                    next.starts_at,
                    prev.starts_at
                )));
            }
            if next.spawn_interval_multiplier > prev.spawn_interval_multiplier
                || next.speed_multiplier < prev.speed_multiplier
                || next.damage_multiplier < prev.damage_multiplier
            {
                return Err(ConfigError::Difficulty(format!(
                    "tier {} is easier than tier {}",
                    index + 1,
                    index
                )));
            }
        }
        Ok(())
    }
}
