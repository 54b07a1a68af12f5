//! Deferred world mutation
//!
//! Stages never create, destroy or cross-write entities while iterating.
//! They queue `EntityCommand`s instead, and the simulation applies the queue
//! in FIFO order at the flush point after the stage. Every command re-checks
//! that its entities still resolve; a command against a dead entity is
//! dropped.

use glam::Quat;
use tracing::trace;

use super::archetypes::Blueprint;
use super::tick::Tick;
use super::world::{Entity, World};

#[derive(Debug, Clone)]
pub enum EntityCommand {
    Spawn(Box<Blueprint>),
    Despawn(Entity),
    /// Tag the entity for the destruction sweep
    MarkForDestroy(Entity),
    SetRotation { entity: Entity, rotation: Quat },
    /// Push a value into the receiver's pending damage mailbox
    AppendDamage { receiver: Entity, amount: i32 },
    /// Remember that `dealer` already hit `receiver`
    RecordDamaged { dealer: Entity, receiver: Entity },
    /// Record the tick at which the attacker may fire again
    SetAttackCooldown {
        entity: Entity,
        tick: Tick,
        expires_at: Tick,
    },
}

/// What a flush actually changed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub spawned: Vec<Entity>,
    pub despawned: usize,
    pub dropped: usize,
}

#[derive(Debug, Default)]
pub struct EntityCommands {
    queue: Vec<EntityCommand>,
}

impl EntityCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: EntityCommand) {
        self.queue.push(command);
    }

    pub fn spawn(&mut self, blueprint: Blueprint) {
        self.push(EntityCommand::Spawn(Box::new(blueprint)));
    }

    pub fn despawn(&mut self, entity: Entity) {
        self.push(EntityCommand::Despawn(entity));
    }

    pub fn mark_for_destroy(&mut self, entity: Entity) {
        self.push(EntityCommand::MarkForDestroy(entity));
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Apply and drain every queued command
    pub fn apply(&mut self, world: &mut World, now: Tick, buffer_capacity: usize) -> FlushReport {
        let mut report = FlushReport::default();

        for command in self.queue.drain(..) {
            let applied = match command {
                EntityCommand::Spawn(blueprint) => match world.spawn(*blueprint, now, buffer_capacity) {
                    Some(entity) => {
                        report.spawned.push(entity);
                        true
                    }
                    None => false,
                },
                EntityCommand::Despawn(entity) => {
                    let removed = world.despawn(entity);
                    if removed {
                        report.despawned += 1;
                    }
                    removed
                }
                EntityCommand::MarkForDestroy(entity) => {
                    let alive = world.is_alive(entity);
                    if alive {
                        world.destroy_marked.insert(entity, ());
                    }
                    alive
                }
                EntityCommand::SetRotation { entity, rotation } => {
                    match world.transforms.get_mut(entity) {
                        Some(transform) => {
                            transform.rotation = rotation;
                            true
                        }
                        None => false,
                    }
                }
                EntityCommand::AppendDamage { receiver, amount } => {
                    match world.pending_damage.get_mut(receiver) {
                        Some(pending) => {
                            pending.push(amount);
                            true
                        }
                        None => false,
                    }
                }
                EntityCommand::RecordDamaged { dealer, receiver } => {
                    match world.damage_dealers.get_mut(dealer) {
                        Some(dealer) => {
                            if !dealer.has_damaged(receiver) {
                                dealer.already_damaged.push(receiver);
                            }
                            true
                        }
                        None => false,
                    }
                }
                EntityCommand::SetAttackCooldown {
                    entity,
                    tick,
                    expires_at,
                } => match world.attack_cooldowns.get_mut(entity) {
                    Some(cooldowns) => {
                        cooldowns.set(tick, expires_at);
                        true
                    }
                    None => false,
                },
            };

            if !applied {
                report.dropped += 1;
            }
        }

        if report.dropped > 0 {
            trace!(tick = %now, dropped = report.dropped, "Dropped commands for stale entities");
        }
        report
    }
}
