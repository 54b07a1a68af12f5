//! Outbound notifications produced by the simulation
//!
//! The simulation never talks to sockets. It queues events with a recipient
//! and the match loop drains the queue after every tick.

use super::components::NetworkId;
use super::tick::Tick;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    All,
    Connection(NetworkId),
}

impl Recipient {
    pub fn includes(&self, network_id: NetworkId) -> bool {
        match self {
            Recipient::All => true,
            Recipient::Connection(id) => *id == network_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    /// Joined players still missing before the countdown starts
    PlayersRemainingToStart { value: u32 },
    /// The tick at which play begins
    GameStartTick { tick: Tick },
    /// Whole seconds until the recipient's player respawns
    RespawnCountdown { seconds: i32 },
    Respawned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub recipient: Recipient,
    pub event: SimEvent,
}

#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Vec<Outbound>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broadcast(&mut self, event: SimEvent) {
        self.pending.push(Outbound {
            recipient: Recipient::All,
            event,
        });
    }

    pub fn send_to(&mut self, network_id: NetworkId, event: SimEvent) {
        self.pending.push(Outbound {
            recipient: Recipient::Connection(network_id),
            event,
        });
    }

    pub fn drain(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
