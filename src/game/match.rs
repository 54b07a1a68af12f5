//! Match task and authoritative tick loop

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SimConfig;
use crate::ws::protocol::ServerMsg;

use super::components::NetworkId;
use super::events::Recipient;
use super::simulation::{SimInput, Simulation};
use super::snapshot::SnapshotBuilder;
use super::state::GamePhase;
use super::tick::Tick;

/// A server message and the connections it is meant for
#[derive(Debug, Clone, PartialEq)]
pub struct Addressed {
    pub recipient: Recipient,
    pub msg: ServerMsg,
}

/// Match errors
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("Match {0} is no longer running")]
    Closed(Uuid),
}

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub tick_rate: u32,
    input_tx: mpsc::Sender<SimInput>,
    events_tx: broadcast::Sender<Addressed>,
    player_count: Arc<AtomicUsize>,
    lobby_open: Arc<AtomicBool>,
    next_network_id: Arc<AtomicU32>,
}

impl MatchHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    pub fn is_lobby_open(&self) -> bool {
        self.lobby_open.load(Ordering::Relaxed)
    }

    /// Register a new connection. The receiver is subscribed before the
    /// connect input is sent, so nothing addressed to it can be missed.
    pub async fn connect(&self) -> Result<(NetworkId, broadcast::Receiver<Addressed>), MatchError> {
        let network_id = NetworkId(self.next_network_id.fetch_add(1, Ordering::Relaxed));
        let events_rx = self.events_tx.subscribe();
        self.send(SimInput::Connect(network_id)).await?;
        Ok((network_id, events_rx))
    }

    pub async fn send(&self, input: SimInput) -> Result<(), MatchError> {
        self.input_tx
            .send(input)
            .await
            .map_err(|_| MatchError::Closed(self.id))
    }

    pub async fn disconnect(&self, network_id: NetworkId) -> Result<(), MatchError> {
        self.send(SimInput::Disconnect(network_id)).await
    }
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn total_players(&self) -> usize {
        self.matches
            .iter()
            .map(|m| m.value().player_count())
            .sum()
    }

    /// Find a match still in its lobby with room for another player
    pub fn find_open_match(&self, player_amount: usize) -> Option<MatchHandle> {
        self.matches
            .iter()
            .find(|entry| entry.value().is_lobby_open() && entry.value().player_count() < player_amount)
            .map(|entry| entry.value().clone())
    }

    /// Join an open lobby, or start a new match task and register it.
    ///
    /// The match removes itself from the registry when its loop ends.
    pub fn find_open_or_create(self: &Arc<Self>, config: &SimConfig, seed: Option<u64>) -> MatchHandle {
        if let Some(handle) = self.find_open_match(config.player_amount as usize) {
            return handle;
        }

        let id = Uuid::new_v4();
        let seed = seed.unwrap_or_else(rand::random);
        let (game_match, handle) = GameMatch::new(id, config.clone(), seed);
        self.insert(handle.clone());

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            game_match.run().await;
            registry.remove(&id);
        });

        info!(match_id = %id, seed, "Match created");
        handle
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative game match
pub struct GameMatch {
    id: Uuid,
    sim: Simulation,
    input_rx: mpsc::Receiver<SimInput>,
    events_tx: broadcast::Sender<Addressed>,
    snapshot_builder: SnapshotBuilder,
    player_count: Arc<AtomicUsize>,
    lobby_open: Arc<AtomicBool>,
    connected: usize,
    last_phase: GamePhase,
}

impl GameMatch {
    /// Create a new match
    pub fn new(id: Uuid, config: SimConfig, seed: u64) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (events_tx, _) = broadcast::channel(256);
        let player_count = Arc::new(AtomicUsize::new(0));
        let lobby_open = Arc::new(AtomicBool::new(true));

        let handle = MatchHandle {
            id,
            tick_rate: config.tick_rate,
            input_tx,
            events_tx: events_tx.clone(),
            player_count: player_count.clone(),
            lobby_open: lobby_open.clone(),
            next_network_id: Arc::new(AtomicU32::new(1)),
        };

        let snapshot_interval = config.snapshot_interval();
        let sim = Simulation::new(config, seed);
        let game_match = Self {
            id,
            last_phase: sim.phase(),
            sim,
            input_rx,
            events_tx,
            snapshot_builder: SnapshotBuilder::new(snapshot_interval),
            player_count,
            lobby_open,
            connected: 0,
        };

        (game_match, handle)
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Run the authoritative tick loop
    pub async fn run(mut self) {
        info!(match_id = %self.id, tick_rate = self.sim.tick_rate(), "Match loop started");

        let tick_duration = Duration::from_micros(1_000_000 / self.sim.tick_rate() as u64);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            if !self.step() {
                break;
            }

            // Check if all players disconnected
            if self.connected == 0 && self.sim.phase() != GamePhase::Lobby {
                info!(match_id = %self.id, "All players left, ending match");
                break;
            }
        }

        self.lobby_open.store(false, Ordering::Relaxed);
        info!(match_id = %self.id, tick = %self.sim.tick(), "Match ended");
    }

    /// Drain inputs, run one tick and publish its output. Returns false once
    /// every handle is gone and the match can never receive input again.
    pub fn step(&mut self) -> bool {
        let mut open = true;
        loop {
            match self.input_rx.try_recv() {
                Ok(input) => self.accept(input),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    open = false;
                    break;
                }
            }
        }

        let tick = self.sim.run_tick();
        self.publish(tick);
        open
    }

    fn accept(&mut self, input: SimInput) {
        match &input {
            SimInput::Connect(_) => self.connected += 1,
            SimInput::Disconnect(_) => self.connected = self.connected.saturating_sub(1),
            _ => {}
        }
        self.player_count.store(self.connected, Ordering::Relaxed);
        self.sim.queue(input);
    }

    fn publish(&mut self, tick: Tick) {
        let phase = self.sim.phase();
        if phase != self.last_phase {
            debug!(match_id = %self.id, tick = %tick, phase = phase.name(), "Phase changed");
            self.last_phase = phase;
            self.snapshot_builder.force_next();
        }
        self.lobby_open
            .store(phase == GamePhase::Lobby, Ordering::Relaxed);

        for outbound in self.sim.drain_events() {
            // No receivers is fine: everyone may have disconnected this tick
            let _ = self.events_tx.send(Addressed {
                recipient: outbound.recipient,
                msg: outbound.event.into(),
            });
        }

        if self.snapshot_builder.should_send() {
            let snapshot = self.snapshot_builder.build(tick, self.sim.world());
            let _ = self.events_tx.send(Addressed {
                recipient: Recipient::All,
                msg: snapshot,
            });
        }
    }
}
