//! Lobby -> Countdown -> Playing

use tracing::info;

use super::components::NetworkId;
use super::events::{EventQueue, SimEvent};
use super::tick::Tick;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Accepting joins until enough players are in
    Lobby,
    /// Start tick fixed, waiting for the clock to reach it
    Countdown { start_tick: Tick },
    /// Gameplay stages run every tick
    Playing { start_tick: Tick },
}

impl GamePhase {
    pub fn start_tick(&self) -> Option<Tick> {
        match self {
            GamePhase::Lobby => None,
            GamePhase::Countdown { start_tick } | GamePhase::Playing { start_tick } => {
                Some(*start_tick)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GamePhase::Lobby => "lobby",
            GamePhase::Countdown { .. } => "countdown",
            GamePhase::Playing { .. } => "playing",
        }
    }
}

/// Phase plus the joined-player counter that gates it
#[derive(Debug, Clone)]
pub struct GameState {
    phase: GamePhase,
    players_joined: u32,
    player_amount: u32,
    countdown_ticks: u32,
}

impl GameState {
    pub fn new(player_amount: u32, countdown_seconds: u32, tick_rate: u32) -> Self {
        Self {
            phase: GamePhase::Lobby,
            players_joined: 0,
            player_amount: player_amount.max(1),
            countdown_ticks: countdown_seconds.saturating_mul(tick_rate),
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.phase, GamePhase::Playing { .. })
    }

    pub fn players_joined(&self) -> u32 {
        self.players_joined
    }

    pub fn players_remaining(&self) -> u32 {
        self.player_amount.saturating_sub(self.players_joined)
    }

    /// Count a processed join request.
    ///
    /// In the lobby this either broadcasts the remaining count or, once the
    /// threshold is reached, fixes the start tick and broadcasts it. Joins
    /// after that only tell the newcomer the start tick.
    pub fn on_join(&mut self, network_id: NetworkId, now: Tick, events: &mut EventQueue) {
        self.players_joined += 1;

        match self.phase {
            GamePhase::Lobby => {
                let remaining = self.players_remaining();
                if remaining == 0 {
                    let start_tick = now.add(self.countdown_ticks);
                    self.phase = GamePhase::Countdown { start_tick };
                    events.broadcast(SimEvent::GameStartTick { tick: start_tick });
                    info!(tick = %now, start_tick = %start_tick, "Countdown started");
                } else {
                    events.broadcast(SimEvent::PlayersRemainingToStart { value: remaining });
                }
            }
            GamePhase::Countdown { start_tick } | GamePhase::Playing { start_tick } => {
                events.send_to(network_id, SimEvent::GameStartTick { tick: start_tick });
            }
        }
    }

    /// A joined connection left. Only the lobby gives the slot back.
    pub fn on_leave(&mut self, events: &mut EventQueue) {
        if self.phase != GamePhase::Lobby {
            return;
        }
        self.players_joined = self.players_joined.saturating_sub(1);
        events.broadcast(SimEvent::PlayersRemainingToStart {
            value: self.players_remaining(),
        });
    }

    /// Enter `Playing` once the clock reaches the start tick. Returns true
    /// on the tick the transition happens.
    pub fn update(&mut self, now: Tick) -> bool {
        if let GamePhase::Countdown { start_tick } = self.phase {
            if now.is_newer_or_equal(start_tick) {
                self.phase = GamePhase::Playing { start_tick };
                info!(tick = %now, "Game started");
                return true;
            }
        }
        false
    }
}
