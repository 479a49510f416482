//! Spawn scheduling
//!
//! Two independent accumulators, one for hazards and one for collectibles.
//! Each draws a jittered base interval when it resets; the hazard threshold
//! is that base scaled by the current difficulty, queried fresh every tick.

use glam::Vec2;
use rand::Rng;

use super::difficulty::Difficulty;
use super::rules::Rules;
use crate::tuning::{SizeClass, Tuning};

/// Resample budget when a rarity tier turns out to have no types
const MAX_RARITY_RESAMPLES: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct HazardSpawn {
    pub kind: u8,
    pub size: SizeClass,
    pub radius: f32,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Radians per second
    pub spin: f32,
    pub damage: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectibleSpawn {
    pub type_id: String,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub param: Option<f32>,
    pub lifetime: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpawnEvent {
    Hazard(HazardSpawn),
    Collectible(CollectibleSpawn),
}

/// Live entity counts, for backpressure
#[derive(Debug, Clone, Copy, Default)]
pub struct Population {
    pub hazards: usize,
    pub collectibles: usize,
}

#[derive(Debug, Clone)]
pub struct Spawner {
    hazard_timer: f32,
    /// Jittered tier-0 interval; scaled by difficulty when compared
    hazard_interval: f32,
    collectible_timer: f32,
    collectible_interval: f32,
}

fn jittered<R: Rng + ?Sized>(base: f32, min: f32, max: f32, rng: &mut R) -> f32 {
    base * rng.random_range(min..=max)
}

impl Spawner {
    pub fn new<R: Rng + ?Sized>(tuning: &Tuning, rng: &mut R) -> Self {
        let hazards = &tuning.hazards;
        let collectibles = &tuning.collectibles;
        Self {
            hazard_timer: 0.0,
            hazard_interval: jittered(
                hazards.spawn_interval,
                hazards.jitter_min,
                hazards.jitter_max,
                rng,
            ),
            collectible_timer: 0.0,
            collectible_interval: jittered(
                collectibles.spawn_interval,
                collectibles.jitter_min,
                collectibles.jitter_max,
                rng,
            ),
        }
    }

    /// Seconds the hazard accumulator must reach at `difficulty`
    pub fn hazard_threshold(&self, difficulty: &Difficulty) -> f32 {
        self.hazard_interval * difficulty.spawn_interval_multiplier
    }

    /// Advance both accumulators. At most one spawn per class per tick;
    /// a class at its population cap holds its accumulator at the threshold.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        difficulty: &Difficulty,
        population: Population,
        rules: &Rules,
        rng: &mut R,
    ) -> Vec<SpawnEvent> {
        let tuning = &rules.tuning;
        let dt = dt.max(0.0);
        let mut events = Vec::new();

        self.hazard_timer += dt;
        let threshold = self.hazard_threshold(difficulty);
        if self.hazard_timer >= threshold {
            if population.hazards < tuning.hazards.max_alive {
                events.push(SpawnEvent::Hazard(roll_hazard(rules, difficulty, rng)));
                self.hazard_timer = 0.0;
                let h = &tuning.hazards;
                self.hazard_interval = jittered(h.spawn_interval, h.jitter_min, h.jitter_max, rng);
            } else {
                self.hazard_timer = threshold;
            }
        }

        self.collectible_timer += dt;
        if self.collectible_timer >= self.collectible_interval {
            let c = &tuning.collectibles;
            if population.collectibles < c.max_alive {
                if let Some(spawn) = roll_collectible(rules, rng) {
                    events.push(SpawnEvent::Collectible(spawn));
                }
                self.collectible_timer = 0.0;
                self.collectible_interval =
                    jittered(c.spawn_interval, c.jitter_min, c.jitter_max, rng);
            } else {
                self.collectible_timer = self.collectible_interval;
            }
        }

        events
    }
}

/// Point just outside one of the four edges, chosen uniformly
fn edge_position<R: Rng + ?Sized>(rules: &Rules, margin: f32, rng: &mut R) -> Vec2 {
    let field = &rules.tuning.playfield;
    match rng.random_range(0..4u8) {
        0 => Vec2::new(rng.random_range(0.0..=field.width), -margin),
        1 => Vec2::new(field.width + margin, rng.random_range(0.0..=field.height)),
        2 => Vec2::new(rng.random_range(0.0..=field.width), field.height + margin),
        _ => Vec2::new(-margin, rng.random_range(0.0..=field.height)),
    }
}

/// Draw a hazard for the given difficulty: type from the tier's weight
/// table, size from the type's permitted set, launched from an edge toward
/// a point near the centre.
pub fn roll_hazard<R: Rng + ?Sized>(rules: &Rules, difficulty: &Difficulty, rng: &mut R) -> HazardSpawn {
    let hazards = &rules.tuning.hazards;
    let index = *rules.hazard_table(difficulty.tier).sample(rng);
    let ty = rules.hazard_type(index);

    let size = ty.sizes[rng.random_range(0..ty.sizes.len())];
    let spec = hazards.sizes.get(size);
    let radius = rng.random_range(spec.min_size..=spec.max_size) / 2.0;

    let speed = rng.random_range(hazards.min_speed..=hazards.max_speed)
        * spec.speed_multiplier
        * difficulty.speed_multiplier;
    let damage =
        (ty.base_damage as f32 * spec.damage_multiplier * difficulty.damage_multiplier).floor() as u32;

    let pos = edge_position(rules, radius, rng);
    let spread = hazards.aim_spread;
    let target = rules.tuning.playfield.center()
        + Vec2::new(
            rng.random_range(-spread.x..=spread.x),
            rng.random_range(-spread.y..=spread.y),
        );
    let dir = (target - pos).try_normalize().unwrap_or(Vec2::Y);
    let spin = rng
        .random_range(-hazards.max_spin_deg..=hazards.max_spin_deg)
        .to_radians();

    HazardSpawn {
        kind: ty.kind,
        size,
        radius,
        pos,
        vel: dir * speed,
        spin,
        damage,
    }
}

/// Draw a collectible: rarity first, then uniformly within that rarity.
/// Collectibles enter above the top edge and fall.
pub fn roll_collectible<R: Rng + ?Sized>(rules: &Rules, rng: &mut R) -> Option<CollectibleSpawn> {
    let tuning = &rules.tuning.collectibles;
    let field = &rules.tuning.playfield;

    for _ in 0..MAX_RARITY_RESAMPLES {
        let rarity = *rules.rarity_table().sample(rng);
        let candidates = rules.powerups_of(rarity);
        if candidates.is_empty() {
            log::warn!("No power-ups registered as {rarity:?}, resampling");
            continue;
        }
        let ty = rules.powerup_at(candidates[rng.random_range(0..candidates.len())]);

        let r = tuning.radius;
        let x = if field.width > 2.0 * r {
            rng.random_range(r..=field.width - r)
        } else {
            field.width / 2.0
        };
        let vel = Vec2::new(
            rng.random_range(-tuning.drift_x.abs()..=tuning.drift_x.abs()),
            rng.random_range(tuning.min_fall_speed..=tuning.max_fall_speed),
        );
        return Some(CollectibleSpawn {
            type_id: ty.id.clone(),
            pos: Vec2::new(x, -r),
            vel,
            radius: r,
            param: ty.params.amount,
            lifetime: tuning.lifetime_secs,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Rarity;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::collections::HashMap;

    const DT: f32 = 1.0 / 120.0;

    fn rules() -> Rules {
        Rules::new(Tuning::default()).unwrap()
    }

    /// Ticks until the first hazard appears with a fixed difficulty
    fn ticks_to_first_hazard(rules: &Rules, difficulty: &Difficulty, seed: u64) -> usize {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut spawner = Spawner::new(&rules.tuning, &mut rng);
        for tick in 1..10_000 {
            let events = spawner.tick(DT, difficulty, Population::default(), rules, &mut rng);
            if events.iter().any(|e| matches!(e, SpawnEvent::Hazard(_))) {
                return tick;
            }
        }
        panic!("no hazard spawned");
    }

    #[test]
    fn test_higher_tier_spawns_sooner() {
        let rules = rules();
        let calm = rules.curve.at(0.0);
        let frantic = rules.curve.at(200.0);
        for seed in 0..20 {
            let slow = ticks_to_first_hazard(&rules, &calm, seed);
            let fast = ticks_to_first_hazard(&rules, &frantic, seed);
            assert!(fast < slow, "seed {seed}: {fast} !< {slow}");
        }
    }

    #[test]
    fn test_higher_tier_hits_harder_on_average() {
        let rules = rules();
        let mut rng = Pcg32::seed_from_u64(5);
        let mean = |difficulty: &Difficulty, rng: &mut Pcg32| {
            let total: u64 = (0..5_000)
                .map(|_| roll_hazard(&rules, difficulty, rng).damage as u64)
                .sum();
            total as f64 / 5_000.0
        };
        let early = mean(&rules.curve.at(0.0), &mut rng);
        let late = mean(&rules.curve.at(200.0), &mut rng);
        assert!(late > early, "{late} <= {early}");
    }

    #[test]
    fn test_hazard_kinds_follow_weights() {
        let rules = rules();
        let difficulty = rules.curve.at(0.0);
        let mut rng = Pcg32::seed_from_u64(77);
        let draws = 50_000;
        let mut counts: HashMap<u8, usize> = HashMap::new();
        for _ in 0..draws {
            *counts.entry(roll_hazard(&rules, &difficulty, &mut rng).kind).or_default() += 1;
        }
        let total: f32 = rules.tuning.hazards.types.iter().map(|t| t.weight).sum();
        for ty in &rules.tuning.hazards.types {
            let expected = (ty.weight / total) as f64;
            let observed = counts.get(&ty.kind).copied().unwrap_or(0) as f64 / draws as f64;
            assert!(
                (observed - expected).abs() < 0.015,
                "kind {}: expected {expected:.3}, observed {observed:.3}",
                ty.kind
            );
        }
    }

    #[test]
    fn test_rarity_follows_weights() {
        let rules = rules();
        let mut rng = Pcg32::seed_from_u64(3);
        let draws = 30_000;
        let mut rare = 0;
        let mut common = 0;
        for _ in 0..draws {
            let spawn = roll_collectible(&rules, &mut rng).unwrap();
            match rules.powerup(&spawn.type_id).unwrap().rarity {
                Rarity::Common => common += 1,
                Rarity::Rare => rare += 1,
                Rarity::Uncommon => {}
            }
        }
        assert!((common as f64 / draws as f64 - 0.70).abs() < 0.015);
        assert!((rare as f64 / draws as f64 - 0.05).abs() < 0.01);
    }

    #[test]
    fn test_backpressure_holds_spawns() {
        let rules = rules();
        let difficulty = rules.curve.at(0.0);
        let mut rng = Pcg32::seed_from_u64(11);
        let mut spawner = Spawner::new(&rules.tuning, &mut rng);
        let full = Population {
            hazards: rules.tuning.hazards.max_alive,
            collectibles: rules.tuning.collectibles.max_alive,
        };

        for _ in 0..(30 * 120) {
            let events = spawner.tick(DT, &difficulty, full, &rules, &mut rng);
            assert!(events.is_empty());
        }

        // Room frees up: the held accumulator fires on the next tick, once
        let events = spawner.tick(DT, &difficulty, Population::default(), &rules, &mut rng);
        let hazards = events
            .iter()
            .filter(|e| matches!(e, SpawnEvent::Hazard(_)))
            .count();
        assert_eq!(hazards, 1);
    }

    #[test]
    fn test_collectibles_enter_from_top() {
        let rules = rules();
        let mut rng = Pcg32::seed_from_u64(21);
        for _ in 0..200 {
            let spawn = roll_collectible(&rules, &mut rng).unwrap();
            assert!(spawn.pos.y < 0.0);
            assert!(spawn.vel.y > 0.0);
            assert!(spawn.pos.x >= spawn.radius && spawn.pos.x <= 800.0 - spawn.radius);
        }
    }

    proptest! {
        #[test]
        fn prop_hazards_respect_type_sizes_and_head_inward(seed in any::<u64>(), elapsed in 0.0f32..300.0) {
            let rules = rules();
            let difficulty = rules.curve.at(elapsed);
            let mut rng = Pcg32::seed_from_u64(seed);
            let field = rules.tuning.playfield;
            for _ in 0..50 {
                let spawn = roll_hazard(&rules, &difficulty, &mut rng);
                let ty = rules
                    .tuning
                    .hazards
                    .types
                    .iter()
                    .find(|t| t.kind == spawn.kind)
                    .unwrap();
                prop_assert!(ty.sizes.contains(&spawn.size));

                let spec = rules.tuning.hazards.sizes.get(spawn.size);
                prop_assert!(spawn.radius * 2.0 >= spec.min_size - 1e-3);
                prop_assert!(spawn.radius * 2.0 <= spec.max_size + 1e-3);

                // Spawns outside the visible field, never culled on arrival
                prop_assert!(field.is_outside(spawn.pos, 0.0));
                prop_assert!(!field.is_outside(spawn.pos, spawn.radius * 4.0));

                let to_center = field.center() - spawn.pos;
                prop_assert!(spawn.vel.dot(to_center) > 0.0);
            }
        }
    }
}
