//! Entity storage: generational ids and sparse-set component tables

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::archetypes::Blueprint;
use super::command_buffer::CommandBuffer;
use super::components::{
    AttackProperties, ChaseTarget, Collider, Connection, DamageOnContact, EntityKind,
    ForwardMotion, HitPoints, NetworkId, Owner, PlayerInput, SprintState, TargetSeeker,
    TeamAffiliation, Transform,
};
use super::tick::Tick;

/// Opaque entity handle.
///
/// The generation changes every time an index is recycled, so a handle held
/// past its entity's death never resolves to the entity that reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    pub index: u32,
    pub generation: u32,
}

#[derive(Debug, Default)]
struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
}

impl EntityAllocator {
    fn allocate(&mut self) -> Entity {
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            return Entity {
                index,
                generation: self.generations[slot],
            };
        }

        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.alive.push(true);
        Entity {
            index,
            generation: 0,
        }
    }

    fn free(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = entity.index as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(entity.index);
        true
    }

    fn is_alive(&self, entity: Entity) -> bool {
        let slot = entity.index as usize;
        slot < self.generations.len()
            && self.alive[slot]
            && self.generations[slot] == entity.generation
    }

    fn live_count(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }
}

/// Component table with O(1) lookup and dense, insertion-ordered iteration.
#[derive(Debug, Clone)]
pub struct SparseSet<T> {
    sparse: Vec<Option<usize>>,
    dense: Vec<(Entity, T)>,
}

impl<T> SparseSet<T> {
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
        }
    }

    pub fn insert(&mut self, entity: Entity, value: T) {
        let slot = entity.index as usize;
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, None);
        }

        match self.sparse[slot] {
            Some(idx) => self.dense[idx] = (entity, value),
            None => {
                self.sparse[slot] = Some(self.dense.len());
                self.dense.push((entity, value));
            }
        }
    }

    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let idx = self.dense_index(entity)?;
        self.sparse[entity.index as usize] = None;
        let (_, value) = self.dense.swap_remove(idx);
        if let Some((moved, _)) = self.dense.get(idx) {
            self.sparse[moved.index as usize] = Some(idx);
        }
        Some(value)
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity).map(|idx| &self.dense[idx].1)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.dense_index(entity).map(move |idx| &mut self.dense[idx].1)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.dense.iter().map(|(e, v)| (*e, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.dense.iter_mut().map(|(e, v)| (*e, v))
    }

    /// Entities in iteration order, detached from the table
    pub fn entities(&self) -> Vec<Entity> {
        self.dense.iter().map(|(e, _)| *e).collect()
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    fn dense_index(&self, entity: Entity) -> Option<usize> {
        let idx = (*self.sparse.get(entity.index as usize)?)?;
        (self.dense[idx].0 == entity).then_some(idx)
    }
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// All entities and their components for one match.
#[derive(Debug, Default)]
pub struct World {
    allocator: EntityAllocator,

    pub kinds: SparseSet<EntityKind>,
    pub transforms: SparseSet<Transform>,
    pub velocities: SparseSet<Vec3>,
    pub teams: SparseSet<TeamAffiliation>,
    pub colliders: SparseSet<Collider>,

    pub hit_points: SparseSet<HitPoints>,
    pub damage_dealers: SparseSet<DamageOnContact>,
    pub pending_damage: SparseSet<Vec<i32>>,
    pub damage_history: SparseSet<CommandBuffer<i32>>,

    pub seekers: SparseSet<TargetSeeker>,
    pub targets: SparseSet<Option<Entity>>,
    pub attacks: SparseSet<AttackProperties>,
    pub attack_cooldowns: SparseSet<CommandBuffer<Tick>>,
    pub chasers: SparseSet<ChaseTarget>,
    pub forward_motion: SparseSet<ForwardMotion>,

    pub inputs: SparseSet<CommandBuffer<PlayerInput>>,
    pub sprint: SparseSet<SprintState>,
    pub owners: SparseSet<Owner>,
    pub connections: SparseSet<Connection>,

    pub destroy_at: SparseSet<Tick>,
    pub destroy_marked: SparseSet<()>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.allocator.live_count()
    }

    /// Create a bare connection entity for `network_id`
    pub fn spawn_connection(&mut self, network_id: NetworkId) -> Entity {
        let entity = self.allocator.allocate();
        self.connections.insert(entity, Connection::new(network_id));
        entity
    }

    /// Instantiate a blueprint. Returns `None` when the blueprint is bound to
    /// a connection that no longer exists.
    pub fn spawn(&mut self, blueprint: Blueprint, now: Tick, buffer_capacity: usize) -> Option<Entity> {
        if let Some(owner) = blueprint.owner {
            if !self.connections.contains(owner.connection) {
                return None;
            }
        }

        let entity = self.allocator.allocate();
        self.kinds.insert(entity, blueprint.kind);
        self.transforms.insert(entity, blueprint.transform);
        self.teams.insert(entity, blueprint.team);

        if blueprint.velocity {
            self.velocities.insert(entity, Vec3::ZERO);
        }
        if let Some(collider) = blueprint.collider {
            self.colliders.insert(entity, collider);
        }
        if let Some(max) = blueprint.hit_points {
            self.hit_points.insert(entity, HitPoints::full(max));
            self.pending_damage.insert(entity, Vec::new());
            self.damage_history
                .insert(entity, CommandBuffer::with_capacity(buffer_capacity));
        }
        if let Some(dealer) = blueprint.damage_on_contact {
            self.damage_dealers.insert(entity, dealer);
        }
        if let Some(seeker) = blueprint.seeker {
            self.seekers.insert(entity, seeker);
            self.targets.insert(entity, None);
        }
        if let Some(attack) = blueprint.attack {
            self.attacks.insert(entity, attack);
            self.attack_cooldowns
                .insert(entity, CommandBuffer::with_capacity(buffer_capacity));
        }
        if let Some(chase) = blueprint.chase {
            self.chasers.insert(entity, chase);
        }
        if let Some(forward) = blueprint.forward_motion {
            self.forward_motion.insert(entity, forward);
        }
        if let Some(sprint) = blueprint.sprint {
            self.sprint.insert(entity, sprint);
            self.inputs
                .insert(entity, CommandBuffer::with_capacity(buffer_capacity));
        }
        if let Some(lifetime) = blueprint.lifetime_ticks {
            self.destroy_at.insert(entity, now.add(lifetime));
        }
        if let Some(owner) = blueprint.owner {
            self.owners.insert(entity, owner);
            if let Some(conn) = self.connections.get_mut(owner.connection) {
                conn.linked.push(entity);
            }
        }

        Some(entity)
    }

    /// Remove an entity and every component it owns.
    ///
    /// Destroying a connection also destroys its linked entities. Returns
    /// false if the entity was already gone.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.allocator.is_alive(entity) {
            return false;
        }

        if let Some(conn) = self.connections.remove(entity) {
            for linked in conn.linked {
                self.despawn(linked);
            }
        }
        if let Some(owner) = self.owners.remove(entity) {
            if let Some(conn) = self.connections.get_mut(owner.connection) {
                conn.linked.retain(|e| *e != entity);
            }
        }

        self.kinds.remove(entity);
        self.transforms.remove(entity);
        self.velocities.remove(entity);
        self.teams.remove(entity);
        self.colliders.remove(entity);
        self.hit_points.remove(entity);
        self.damage_dealers.remove(entity);
        self.pending_damage.remove(entity);
        self.damage_history.remove(entity);
        self.seekers.remove(entity);
        self.targets.remove(entity);
        self.attacks.remove(entity);
        self.attack_cooldowns.remove(entity);
        self.chasers.remove(entity);
        self.forward_motion.remove(entity);
        self.inputs.remove(entity);
        self.sprint.remove(entity);
        self.destroy_at.remove(entity);
        self.destroy_marked.remove(entity);

        self.allocator.free(entity)
    }

    /// Position of `entity` if it still resolves
    pub fn position(&self, entity: Entity) -> Option<Vec3> {
        self.transforms.get(entity).map(|t| t.position)
    }

    pub fn connection_by_network_id(&self, network_id: NetworkId) -> Option<Entity> {
        self.connections
            .iter()
            .find(|(_, conn)| conn.network_id == network_id)
            .map(|(entity, _)| entity)
    }

    /// Player entities currently linked to the connection with `network_id`
    pub fn players_of(&self, network_id: NetworkId) -> Vec<Entity> {
        self.connection_by_network_id(network_id)
            .and_then(|conn| self.connections.get(conn))
            .map(|conn| {
                conn.linked
                    .iter()
                    .copied()
                    .filter(|e| self.kinds.get(*e) == Some(&EntityKind::Player))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.kinds.iter().filter(|(_, k)| **k == kind).count()
    }
}
