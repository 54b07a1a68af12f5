//! Tick broadcast snapshots

use crate::ws::protocol::{EntitySnapshot, ServerMsg};

use super::tick::Tick;
use super::world::World;

/// Decides when to broadcast and builds the snapshot message
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (phase changes, respawns)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Every entity with a kind and transform, in storage order
    pub fn build(&self, tick: Tick, world: &World) -> ServerMsg {
        let entities = world
            .kinds
            .iter()
            .filter_map(|(entity, kind)| {
                let transform = world.transforms.get(entity)?;
                Some(EntitySnapshot {
                    id: entity,
                    kind: *kind,
                    team: world.teams.get(entity).copied().unwrap_or_default(),
                    position: transform.position,
                    rotation: transform.rotation,
                    hit_points: world.hit_points.get(entity).map(|hp| hp.displayed()),
                    max_hit_points: world.hit_points.get(entity).map(|hp| hp.max),
                    owner: world.owners.get(entity).map(|o| o.network_id),
                })
            })
            .collect();

        ServerMsg::Snapshot { tick, entities }
    }
}
