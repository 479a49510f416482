//! Collision resolution
//!
//! Pure function of one snapshot: which hazards and collectibles touch the
//! ship, and which hazards sit inside a live area burst. Nothing is mutated
//! here, so the effect engine always sees a consistent picture.

use glam::Vec2;

use super::state::{Collectible, Hazard, Ship};
use super::timed::{TimedEffectKind, TimedEffects};

/// Hazard destroyed by an area burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstKill {
    pub effect_id: u32,
    pub hazard_id: u32,
}

/// Everything that touched this tick, each list sorted by entity id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionReport {
    pub ship_hazards: Vec<u32>,
    pub ship_collectibles: Vec<u32>,
    pub burst_kills: Vec<BurstKill>,
}

impl CollisionReport {
    pub fn is_empty(&self) -> bool {
        self.ship_hazards.is_empty()
            && self.ship_collectibles.is_empty()
            && self.burst_kills.is_empty()
    }
}

/// Touching counts as overlap
#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let reach = ra + rb;
    a.distance_squared(b) <= reach * reach
}

#[inline]
pub fn point_in_circle(point: Vec2, center: Vec2, radius: f32) -> bool {
    point.distance_squared(center) <= radius * radius
}

/// Resolve one snapshot. Entity slices are expected sorted by id.
///
/// A hazard inside a burst is reported only as a burst kill, never also as
/// a ship hit, and only once even when several bursts overlap it.
pub fn resolve(
    ship: &Ship,
    hazards: &[Hazard],
    collectibles: &[Collectible],
    effects: &TimedEffects,
) -> CollisionReport {
    let mut report = CollisionReport::default();

    for hazard in hazards {
        let burst = effects
            .of_kind(TimedEffectKind::AreaBurst)
            .find(|b| point_in_circle(hazard.pos, b.params.center, b.params.radius));
        if let Some(burst) = burst {
            report.burst_kills.push(BurstKill {
                effect_id: burst.id,
                hazard_id: hazard.id,
            });
        } else if circles_overlap(ship.pos, ship.radius, hazard.pos, hazard.radius) {
            report.ship_hazards.push(hazard.id);
        }
    }

    report.ship_collectibles = collectibles
        .iter()
        .filter(|c| circles_overlap(ship.pos, ship.radius, c.pos, c.radius))
        .map(|c| c.id)
        .collect();

    report.ship_hazards.sort_unstable();
    report.ship_collectibles.sort_unstable();
    report.burst_kills.sort_unstable_by_key(|k| k.hazard_id);
    report
}
