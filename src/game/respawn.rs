//! Player respawn scheduling
//!
//! Entries reference the owning connection by entity id. The connection may
//! disconnect while an entry waits, so liveness is checked both when the
//! entry is scheduled and when it comes due.

use tracing::{debug, info};

use super::archetypes::Blueprint;
use super::components::{NetworkId, Owner};
use super::deferred::EntityCommands;
use super::events::{EventQueue, SimEvent};
use super::spawner::PlayerPlacement;
use super::tick::{seconds_until, Tick};
use super::world::{Entity, World};
use crate::config::SimConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RespawnEntry {
    pub connection: Entity,
    pub network_id: NetworkId,
    pub respawn_tick: Tick,
    last_announced: Option<i32>,
}

#[derive(Debug, Default)]
pub struct RespawnRegistry {
    entries: Vec<RespawnEntry>,
}

impl RespawnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a respawn for the owner of a dead player. Returns false when the
    /// owning connection is already gone.
    pub fn schedule(&mut self, world: &World, owner: Owner, respawn_tick: Tick) -> bool {
        if !world.connections.contains(owner.connection) {
            debug!(network_id = %owner.network_id, "Owner disconnected, respawn not scheduled");
            return false;
        }

        self.entries.push(RespawnEntry {
            connection: owner.connection,
            network_id: owner.network_id,
            respawn_tick,
            last_announced: None,
        });
        true
    }

    pub fn entries(&self) -> &[RespawnEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_pending(&self, network_id: NetworkId) -> bool {
        self.entries.iter().any(|e| e.network_id == network_id)
    }

    /// Respawn every due entry, drop entries whose connection is gone and
    /// announce the remaining seconds to owners still waiting.
    ///
    /// Countdown notifications are only sent when the whole-second value
    /// changes.
    pub fn process(
        &mut self,
        world: &World,
        now: Tick,
        config: &SimConfig,
        placement: &mut PlayerPlacement,
        commands: &mut EntityCommands,
        events: &mut EventQueue,
    ) -> usize {
        let mut respawned = 0;

        self.entries.retain_mut(|entry| {
            if !world.connections.contains(entry.connection) {
                debug!(network_id = %entry.network_id, "Dropping respawn for disconnected owner");
                return false;
            }

            if now.is_newer_or_equal(entry.respawn_tick) {
                let owner = Owner {
                    network_id: entry.network_id,
                    connection: entry.connection,
                };
                commands.spawn(Blueprint::player(config, placement.next_position(), owner));
                events.send_to(entry.network_id, SimEvent::Respawned);
                info!(network_id = %entry.network_id, tick = %now, "Player respawned");
                respawned += 1;
                return false;
            }

            let seconds = seconds_until(now, entry.respawn_tick, config.tick_rate);
            if entry.last_announced != Some(seconds) {
                entry.last_announced = Some(seconds);
                events.send_to(entry.network_id, SimEvent::RespawnCountdown { seconds });
            }
            true
        });

        respawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::Recipient;

    struct Fixture {
        world: World,
        registry: RespawnRegistry,
        config: SimConfig,
        placement: PlayerPlacement,
        commands: EntityCommands,
        events: EventQueue,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                world: World::new(),
                registry: RespawnRegistry::new(),
                config: SimConfig::default(),
                placement: PlayerPlacement::new(1, 10.0),
                commands: EntityCommands::new(),
                events: EventQueue::new(),
            }
        }

        fn owner(&mut self, id: u32) -> Owner {
            Owner {
                network_id: NetworkId(id),
                connection: self.world.spawn_connection(NetworkId(id)),
            }
        }

        fn process(&mut self, now: Tick) -> usize {
            let n = self.registry.process(
                &self.world,
                now,
                &self.config,
                &mut self.placement,
                &mut self.commands,
                &mut self.events,
            );
            self.commands.apply(&mut self.world, now, 8);
            n
        }
    }

    #[test]
    fn due_entry_respawns_exactly_once() {
        let mut fx = Fixture::new();
        let owner = fx.owner(4);
        assert!(fx.registry.schedule(&fx.world, owner, Tick::new(100)));

        assert_eq!(fx.process(Tick::new(99)), 0);
        assert_eq!(fx.process(Tick::new(100)), 1);
        assert_eq!(fx.process(Tick::new(101)), 0);
        assert!(fx.registry.is_empty());

        let players = fx.world.players_of(NetworkId(4));
        assert_eq!(players.len(), 1);
        assert_eq!(fx.world.owners.get(players[0]).unwrap().connection, owner.connection);
    }

    #[test]
    fn disconnected_owner_is_dropped_silently() {
        let mut fx = Fixture::new();
        let owner = fx.owner(2);
        fx.registry.schedule(&fx.world, owner, Tick::new(10));
        fx.world.despawn(owner.connection);

        assert_eq!(fx.process(Tick::new(20)), 0);
        assert!(fx.registry.is_empty());
        assert_eq!(fx.world.entity_count(), 0);
        assert!(!fx.registry.schedule(&fx.world, owner, Tick::new(30)));
    }

    #[test]
    fn countdown_is_announced_on_change_only() {
        let mut fx = Fixture::new();
        let owner = fx.owner(9);
        fx.registry.schedule(&fx.world, owner, Tick::new(120));

        fx.process(Tick::new(0));
        fx.process(Tick::new(1));
        fx.process(Tick::new(59));
        fx.process(Tick::new(60));
        let sent: Vec<_> = fx.events.drain();

        assert_eq!(
            sent.iter().map(|o| o.event.clone()).collect::<Vec<_>>(),
            vec![
                SimEvent::RespawnCountdown { seconds: 2 },
                SimEvent::RespawnCountdown { seconds: 1 },
            ]
        );
        assert!(sent
            .iter()
            .all(|o| o.recipient == Recipient::Connection(NetworkId(9))));
    }
}
