//! The per-tick pipeline of one match
//!
//! `Simulation` owns every piece of match state and advances it one fixed
//! step at a time. It is synchronous and free of I/O: the match loop feeds it
//! `SimInput`s, calls `run_tick`, and drains the queued `Outbound` events.

use tracing::{debug, trace};

use super::archetypes::Blueprint;
use super::combat::CombatSystem;
use super::components::{NetworkId, Owner, PlayerInput};
use super::deferred::{EntityCommands, FlushReport};
use super::events::{EventQueue, Outbound};
use super::lifecycle::LifecycleSystem;
use super::movement::MovementSystem;
use super::physics::{PhysicsQuery, SphereOverlapPhysics};
use super::respawn::RespawnRegistry;
use super::spawner::{EnemySpawner, PlayerPlacement};
use super::state::{GamePhase, GameState};
use super::targeting::TargetingSystem;
use super::tick::{Tick, TickClock};
use super::world::World;
use crate::config::SimConfig;

/// Something that happened on the network side since the last tick
#[derive(Debug, Clone, PartialEq)]
pub enum SimInput {
    Connect(NetworkId),
    Disconnect(NetworkId),
    RequestGameEntry(NetworkId),
    Input {
        network_id: NetworkId,
        tick: Tick,
        input: PlayerInput,
    },
}

pub struct Simulation<P: PhysicsQuery = SphereOverlapPhysics> {
    config: SimConfig,
    clock: TickClock,
    world: World,
    physics: P,
    state: GameState,
    respawns: RespawnRegistry,
    spawner: EnemySpawner,
    placement: PlayerPlacement,
    commands: EntityCommands,
    events: EventQueue,
    inbox: Vec<SimInput>,
}

impl Simulation<SphereOverlapPhysics> {
    pub fn new(config: SimConfig, seed: u64) -> Self {
        Self::with_physics(config, seed, SphereOverlapPhysics)
    }
}

impl<P: PhysicsQuery> Simulation<P> {
    pub fn with_physics(config: SimConfig, seed: u64, physics: P) -> Self {
        Self {
            clock: TickClock::new(config.tick_rate),
            state: GameState::new(config.player_amount, config.countdown_seconds, config.tick_rate),
            spawner: EnemySpawner::new(&config),
            placement: PlayerPlacement::new(seed, config.player.spawn_half_width),
            world: World::new(),
            physics,
            respawns: RespawnRegistry::new(),
            commands: EntityCommands::new(),
            events: EventQueue::new(),
            inbox: Vec::new(),
            config,
        }
    }

    /// Start counting from `start` instead of zero
    pub fn starting_at(mut self, start: Tick) -> Self {
        self.clock = TickClock::starting_at(start, self.config.tick_rate);
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tick(&self) -> Tick {
        self.clock.current()
    }

    pub fn tick_rate(&self) -> u32 {
        self.clock.tick_rate()
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    pub fn respawns(&self) -> &RespawnRegistry {
        &self.respawns
    }

    pub fn spawner(&self) -> &EnemySpawner {
        &self.spawner
    }

    /// Queue an input for the next tick
    pub fn queue(&mut self, input: SimInput) {
        self.inbox.push(input);
    }

    pub fn drain_events(&mut self) -> Vec<Outbound> {
        self.events.drain()
    }

    /// Advance one tick and return it.
    ///
    /// Stage order: inputs, phase transition, then (only while playing)
    /// spawner, targeting, movement, attacks, timers, contacts, aggregation,
    /// application, destruction sweep, respawns. Each stage that queues
    /// commands is followed by a flush.
    pub fn run_tick(&mut self) -> Tick {
        let now = self.clock.advance();

        self.process_inputs(now);
        self.flush(now);

        self.state.update(now);
        if !self.state.is_playing() {
            return now;
        }

        let dt = self.clock.delta();
        let smoothing = self.config.player.look_smoothing;

        self.spawner.update(&self.config, dt, &mut self.commands);
        self.flush(now);

        TargetingSystem::update(&mut self.world, &self.physics);

        MovementSystem::update_players(&mut self.world, now, dt, smoothing);
        MovementSystem::update_chasers(&mut self.world, dt, smoothing);
        MovementSystem::update_forward_motion(&mut self.world);
        MovementSystem::integrate(&mut self.world, dt);

        CombatSystem::execute_attacks(&self.world, now, self.config.tick_rate, &mut self.commands);
        self.flush(now);

        LifecycleSystem::mark_expired(&self.world, now, &mut self.commands);
        self.flush(now);

        CombatSystem::detect_contacts(
            &self.world,
            &mut self.physics,
            self.config.friendly_fire_screening,
            &mut self.commands,
        );
        self.flush(now);

        CombatSystem::aggregate_damage(&mut self.world, now);

        let depleted = CombatSystem::apply_damage(&mut self.world, now, &mut self.commands);
        if !depleted.is_empty() {
            debug!(tick = %now, count = depleted.len(), "Hit points depleted");
        }
        self.flush(now);

        LifecycleSystem::sweep(
            &self.world,
            now,
            self.config.respawn_tick_count,
            &mut self.respawns,
            &mut self.commands,
        );
        self.flush(now);

        self.respawns.process(
            &self.world,
            now,
            &self.config,
            &mut self.placement,
            &mut self.commands,
            &mut self.events,
        );
        self.flush(now);

        now
    }

    fn flush(&mut self, now: Tick) -> FlushReport {
        self.commands
            .apply(&mut self.world, now, self.config.command_buffer_capacity)
    }

    fn process_inputs(&mut self, now: Tick) {
        for input in std::mem::take(&mut self.inbox) {
            match input {
                SimInput::Connect(network_id) => self.connect(network_id),
                SimInput::Disconnect(network_id) => self.disconnect(network_id),
                SimInput::RequestGameEntry(network_id) => self.request_game_entry(network_id, now),
                SimInput::Input {
                    network_id,
                    tick,
                    input,
                } => self.record_input(network_id, tick, input),
            }
        }
    }

    fn connect(&mut self, network_id: NetworkId) {
        if self.world.connection_by_network_id(network_id).is_some() {
            debug!(network_id = %network_id, "Connection already registered");
            return;
        }
        self.world.spawn_connection(network_id);
        debug!(network_id = %network_id, "Connection registered");
    }

    fn disconnect(&mut self, network_id: NetworkId) {
        let Some(connection) = self.world.connection_by_network_id(network_id) else {
            return;
        };
        let was_in_game = self
            .world
            .connections
            .get(connection)
            .map_or(false, |c| c.in_game);

        self.commands.despawn(connection);
        if was_in_game {
            self.state.on_leave(&mut self.events);
        }
        debug!(network_id = %network_id, was_in_game, "Connection removed");
    }

    fn request_game_entry(&mut self, network_id: NetworkId, now: Tick) {
        let Some(connection) = self.world.connection_by_network_id(network_id) else {
            debug!(network_id = %network_id, "Join request from unknown connection");
            return;
        };
        let Some(conn) = self.world.connections.get_mut(connection) else {
            return;
        };
        if conn.in_game {
            debug!(network_id = %network_id, "Duplicate join request ignored");
            return;
        }
        conn.in_game = true;

        let owner = Owner {
            network_id,
            connection,
        };
        let position = self.placement.next_position();
        self.commands
            .spawn(Blueprint::player(&self.config, position, owner));
        self.state.on_join(network_id, now, &mut self.events);
    }

    fn record_input(&mut self, network_id: NetworkId, tick: Tick, input: PlayerInput) {
        let players = self.world.players_of(network_id);
        if players.is_empty() {
            trace!(network_id = %network_id, tick = %tick, "Input without a live player");
        }
        for player in players {
            if let Some(inputs) = self.world.inputs.get_mut(player) {
                inputs.set(tick, input);
            }
        }
    }
}
