//! Destroy-on-timer and the unified destruction sweep

use tracing::{debug, info};

use super::components::EntityKind;
use super::deferred::EntityCommands;
use super::respawn::RespawnRegistry;
use super::tick::Tick;
use super::world::World;

pub struct LifecycleSystem;

impl LifecycleSystem {
    /// Mark entities whose lifetime ran out at or before `now`
    pub fn mark_expired(world: &World, now: Tick, commands: &mut EntityCommands) -> usize {
        let mut expired = 0;
        for (entity, destroy_at) in world.destroy_at.iter() {
            if now.is_newer_or_equal(*destroy_at) && !world.destroy_marked.contains(entity) {
                commands.mark_for_destroy(entity);
                expired += 1;
            }
        }
        expired
    }

    /// Queue every marked entity for removal.
    ///
    /// Dead players get a respawn entry at `now + respawn_ticks` first, bound
    /// to their owning connection. Returns the number of entities queued.
    pub fn sweep(
        world: &World,
        now: Tick,
        respawn_ticks: u32,
        respawns: &mut RespawnRegistry,
        commands: &mut EntityCommands,
    ) -> usize {
        let marked = world.destroy_marked.entities();

        for &entity in &marked {
            if world.kinds.get(entity) == Some(&EntityKind::Player) {
                match world.owners.get(entity) {
                    Some(owner) => {
                        let respawn_tick = now.add(respawn_ticks);
                        if respawns.schedule(world, *owner, respawn_tick) {
                            info!(
                                network_id = %owner.network_id,
                                respawn_tick = %respawn_tick,
                                "Player died"
                            );
                        }
                    }
                    None => debug!(entity = ?entity, "Dead player has no owner"),
                }
            }
            commands.despawn(entity);
        }

        marked.len()
    }
}
