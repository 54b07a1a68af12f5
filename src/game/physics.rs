//! Spatial queries consumed by targeting and combat
//!
//! The simulation only needs two capabilities from a physics backend: a
//! sphere overlap query filtered by layer mask, and the stream of pairwise
//! contacts for the current tick. `SphereOverlapPhysics` answers both from the
//! colliders stored in the world; `ScriptedPhysics` replays recorded results.

use glam::Vec3;

use super::components::ContactKind;
use super::world::{Entity, World};

/// Collision layer bits
pub mod layers {
    pub const PLAYER: u32 = 1 << 1;
    pub const ENEMY: u32 = 1 << 2;
    pub const PROJECTILE: u32 = 1 << 3;
    pub const STRUCTURE: u32 = 1 << 4;
}

/// One result of an overlap query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceHit {
    pub entity: Entity,
    /// Distance from the query center to the collider surface
    pub distance: f32,
}

/// Two entities touching this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub a: Entity,
    pub b: Entity,
    pub kind: ContactKind,
}

impl ContactEvent {
    pub fn trigger(a: Entity, b: Entity) -> Self {
        Self {
            a,
            b,
            kind: ContactKind::Trigger,
        }
    }

    pub fn collision(a: Entity, b: Entity) -> Self {
        Self {
            a,
            b,
            kind: ContactKind::Collision,
        }
    }
}

/// Physics capability the simulation consumes.
///
/// Implementations must return results in a deterministic order for a given
/// world state, since targeting breaks distance ties by iteration order.
pub trait PhysicsQuery: Send {
    fn overlap_sphere(&self, world: &World, center: Vec3, radius: f32, mask: u32) -> Vec<DistanceHit>;

    fn contact_events(&mut self, world: &World) -> Vec<ContactEvent>;
}

/// Brute-force sphere tests over every collider in the world
#[derive(Debug, Default, Clone)]
pub struct SphereOverlapPhysics;

impl PhysicsQuery for SphereOverlapPhysics {
    fn overlap_sphere(&self, world: &World, center: Vec3, radius: f32, mask: u32) -> Vec<DistanceHit> {
        world
            .colliders
            .iter()
            .filter(|(_, collider)| collider.belongs_to & mask != 0)
            .filter_map(|(entity, collider)| {
                let position = world.position(entity)?;
                let surface = (position.distance(center) - collider.radius).max(0.0);
                (surface <= radius).then_some(DistanceHit {
                    entity,
                    distance: surface,
                })
            })
            .collect()
    }

    fn contact_events(&mut self, world: &World) -> Vec<ContactEvent> {
        let bodies: Vec<_> = world
            .colliders
            .iter()
            .filter_map(|(entity, collider)| Some((entity, *collider, world.position(entity)?)))
            .collect();

        let mut events = Vec::new();
        for (i, (a, ca, pa)) in bodies.iter().enumerate() {
            for (b, cb, pb) in bodies.iter().skip(i + 1) {
                let interacts =
                    ca.collides_with & cb.belongs_to != 0 && cb.collides_with & ca.belongs_to != 0;
                if !interacts {
                    continue;
                }

                let reach = ca.radius + cb.radius;
                if pa.distance_squared(*pb) > reach * reach {
                    continue;
                }

                let kind = if ca.is_trigger || cb.is_trigger {
                    ContactKind::Trigger
                } else {
                    ContactKind::Collision
                };
                events.push(ContactEvent { a: *a, b: *b, kind });
            }
        }
        events
    }
}

/// Replays queued contact events and fixed overlap results.
///
/// Contacts queued with [`push_contact`](Self::push_contact) are reported on
/// the next call to `contact_events` and then discarded. Overlap queries fall
/// back to sphere tests unless explicit hits were provided.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPhysics {
    contacts: Vec<ContactEvent>,
    overlap_hits: Option<Vec<DistanceHit>>,
}

impl ScriptedPhysics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_contact(&mut self, event: ContactEvent) {
        self.contacts.push(event);
    }

    /// Every overlap query returns exactly these hits, in this order
    pub fn set_overlap_hits(&mut self, hits: Vec<DistanceHit>) {
        self.overlap_hits = Some(hits);
    }
}

impl PhysicsQuery for ScriptedPhysics {
    fn overlap_sphere(&self, world: &World, center: Vec3, radius: f32, mask: u32) -> Vec<DistanceHit> {
        match &self.overlap_hits {
            Some(hits) => hits.clone(),
            None => SphereOverlapPhysics.overlap_sphere(world, center, radius, mask),
        }
    }

    fn contact_events(&mut self, _world: &World) -> Vec<ContactEvent> {
        std::mem::take(&mut self.contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archetypes::Blueprint;
    use crate::game::components::{Collider, EntityKind, TeamAffiliation, Transform};
    use crate::game::tick::Tick;

    fn body(world: &mut World, x: f32, belongs_to: u32, collides_with: u32, is_trigger: bool) -> Entity {
        let mut bp = Blueprint::new(
            EntityKind::Slime,
            Transform::from_position(Vec3::new(x, 0.0, 0.0)),
            TeamAffiliation::Enemy,
        );
        bp.collider = Some(Collider {
            radius: 0.5,
            belongs_to,
            collides_with,
            is_trigger,
        });
        world.spawn(bp, Tick::new(0), 8).unwrap()
    }

    #[test]
    fn overlap_respects_mask_and_radius() {
        let mut world = World::new();
        let near = body(&mut world, 2.0, layers::PLAYER, 0, false);
        let _wrong_layer = body(&mut world, 1.0, layers::ENEMY, 0, false);
        let _far = body(&mut world, 20.0, layers::PLAYER, 0, false);

        let hits = SphereOverlapPhysics.overlap_sphere(&world, Vec3::ZERO, 5.0, layers::PLAYER);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity, near);
        assert!((hits[0].distance - 1.5).abs() < 1e-5);
    }

    #[test]
    fn contacts_require_mutual_layers() {
        let mut world = World::new();
        let player = body(&mut world, 0.0, layers::PLAYER, layers::PROJECTILE | layers::ENEMY, false);
        let shot = body(&mut world, 0.6, layers::PROJECTILE, layers::PLAYER, true);
        let _ghost = body(&mut world, 0.3, layers::STRUCTURE, 0, false);

        let events = SphereOverlapPhysics.contact_events(&world);
        assert_eq!(events, vec![ContactEvent::trigger(player, shot)]);
    }

    #[test]
    fn scripted_contacts_are_reported_once() {
        let world = World::new();
        let a = Entity { index: 0, generation: 0 };
        let b = Entity { index: 1, generation: 0 };
        let mut physics = ScriptedPhysics::new();
        physics.push_contact(ContactEvent::collision(a, b));

        assert_eq!(physics.contact_events(&world).len(), 1);
        assert!(physics.contact_events(&world).is_empty());
    }
}
