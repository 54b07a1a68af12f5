//! Nearest-enemy target selection

use glam::Vec3;
use tracing::trace;

use super::physics::{DistanceHit, PhysicsQuery};
use super::world::{Entity, World};

pub struct TargetingSystem;

impl TargetingSystem {
    /// Re-evaluate the target of every seeker.
    ///
    /// Targets are not sticky: each tick the nearest opposing hit wins, and a
    /// seeker with no valid hit is cleared to `None`.
    pub fn update(world: &mut World, physics: &dyn PhysicsQuery) {
        let selections: Vec<(Entity, Option<Entity>)> = world
            .seekers
            .iter()
            .filter_map(|(seeker, params)| {
                let center = world.position(seeker)?;
                let hits = physics.overlap_sphere(world, center, params.radius, params.mask);
                Some((seeker, Self::select(world, seeker, &hits)))
            })
            .collect();

        for (seeker, selected) in selections {
            if let Some(slot) = world.targets.get_mut(seeker) {
                *slot = selected;
            }
        }
    }

    /// Nearest hit that is alive and not on the seeker's team.
    ///
    /// Ties keep the earlier hit, so the result only depends on hit order.
    pub fn select(world: &World, seeker: Entity, hits: &[DistanceHit]) -> Option<Entity> {
        let team = world.teams.get(seeker).copied().unwrap_or_default();
        let mut best: Option<DistanceHit> = None;

        for hit in hits {
            if hit.entity == seeker || !world.is_alive(hit.entity) {
                continue;
            }
            let other = world.teams.get(hit.entity).copied().unwrap_or_default();
            if other == team {
                continue;
            }
            if best.map_or(true, |b| hit.distance < b.distance) {
                best = Some(*hit);
            }
        }

        if best.is_none() {
            trace!(seeker = ?seeker, candidates = hits.len(), "No valid target");
        }
        best.map(|hit| hit.entity)
    }

    /// Current target and its position, if the reference still resolves
    pub fn resolve(world: &World, seeker: Entity) -> Option<(Entity, Vec3)> {
        let target = (*world.targets.get(seeker)?)?;
        if !world.is_alive(target) {
            return None;
        }
        Some((target, world.position(target)?))
    }
}
