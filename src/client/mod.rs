//! Client-side match view and UI notifications
//!
//! `ClientView` consumes server messages, keeps the local input history and
//! derives the countdown display from tick arithmetic. Presentation code
//! subscribes through `MatchObserver`; every callback is fire-and-forget.

use crate::game::command_buffer::CommandBuffer;
use crate::game::components::{NetworkId, PlayerInput};
use crate::game::tick::{seconds_until, Tick};
use crate::game::world::Entity;
use crate::ws::protocol::{ClientMsg, EntitySnapshot, ServerMsg};

/// UI hooks. Every method defaults to doing nothing.
pub trait MatchObserver {
    fn players_remaining_to_start(&mut self, _value: u32) {}
    fn countdown_seconds_remaining(&mut self, _seconds: i32) {}
    fn countdown_ended(&mut self) {}
    fn respawn_seconds_remaining(&mut self, _seconds: i32) {}
    fn respawn_completed(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
    PlayersRemainingToStart(u32),
    CountdownSecondsRemaining(i32),
    CountdownEnded,
    RespawnSecondsRemaining(i32),
    RespawnCompleted,
}

/// Observer that records notifications for polling once per frame
#[derive(Debug, Default)]
pub struct ObserverQueue {
    events: Vec<ObserverEvent>,
}

impl ObserverQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<ObserverEvent> {
        std::mem::take(&mut self.events)
    }
}

impl MatchObserver for ObserverQueue {
    fn players_remaining_to_start(&mut self, value: u32) {
        self.events.push(ObserverEvent::PlayersRemainingToStart(value));
    }

    fn countdown_seconds_remaining(&mut self, seconds: i32) {
        self.events.push(ObserverEvent::CountdownSecondsRemaining(seconds));
    }

    fn countdown_ended(&mut self) {
        self.events.push(ObserverEvent::CountdownEnded);
    }

    fn respawn_seconds_remaining(&mut self, seconds: i32) {
        self.events.push(ObserverEvent::RespawnSecondsRemaining(seconds));
    }

    fn respawn_completed(&mut self) {
        self.events.push(ObserverEvent::RespawnCompleted);
    }
}

#[derive(Debug)]
pub struct ClientView {
    network_id: Option<NetworkId>,
    tick_rate: u32,
    start_tick: Option<Tick>,
    last_countdown: Option<i32>,
    countdown_done: bool,
    server_tick: Tick,
    entities: Vec<EntitySnapshot>,
    inputs: CommandBuffer<PlayerInput>,
}

impl ClientView {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            network_id: None,
            tick_rate: tick_rate.max(1),
            start_tick: None,
            last_countdown: None,
            countdown_done: false,
            server_tick: Tick::default(),
            entities: Vec::new(),
            inputs: CommandBuffer::new(),
        }
    }

    pub fn network_id(&self) -> Option<NetworkId> {
        self.network_id
    }

    pub fn start_tick(&self) -> Option<Tick> {
        self.start_tick
    }

    /// Tick of the latest snapshot received
    pub fn server_tick(&self) -> Tick {
        self.server_tick
    }

    pub fn entities(&self) -> &[EntitySnapshot] {
        &self.entities
    }

    /// Entity ids owned by this connection in the latest snapshot
    pub fn own_entities(&self) -> Vec<Entity> {
        self.entities
            .iter()
            .filter(|e| e.owner.is_some() && e.owner == self.network_id)
            .map(|e| e.id)
            .collect()
    }

    /// Remember the local intent for `tick` and build the message for it
    pub fn record_input(&mut self, tick: Tick, input: PlayerInput) -> ClientMsg {
        self.inputs.set(tick, input);
        ClientMsg::Input {
            tick,
            move_x: input.movement.x,
            move_y: input.movement.y,
            sprint: input.sprint,
        }
    }

    /// Input in effect at `tick`, as the server will resolve it
    pub fn input_at(&self, tick: Tick) -> PlayerInput {
        self.inputs.get_at_or_before(tick).copied().unwrap_or_default()
    }

    pub fn apply(&mut self, msg: &ServerMsg, observer: &mut dyn MatchObserver) {
        match msg {
            ServerMsg::Welcome {
                network_id,
                tick_rate,
                ..
            } => {
                self.network_id = Some(*network_id);
                self.tick_rate = (*tick_rate).max(1);
            }
            ServerMsg::PlayersRemainingToStart { value } => {
                observer.players_remaining_to_start(*value);
            }
            ServerMsg::GameStartTick { tick } => {
                self.start_tick = Some(*tick);
                self.last_countdown = None;
                self.countdown_done = false;
            }
            ServerMsg::Snapshot { tick, entities } => {
                self.server_tick = *tick;
                self.entities = entities.clone();
            }
            ServerMsg::RespawnCountdown { seconds } => {
                observer.respawn_seconds_remaining(*seconds);
            }
            ServerMsg::Respawned => observer.respawn_completed(),
            ServerMsg::Error { .. } | ServerMsg::Pong { .. } => {}
        }
    }

    /// Update the countdown display for the local tick `now`.
    ///
    /// Purely cosmetic: the server decides when play starts.
    pub fn update(&mut self, now: Tick, observer: &mut dyn MatchObserver) {
        let Some(start_tick) = self.start_tick else {
            return;
        };
        if self.countdown_done {
            return;
        }

        if now.is_newer_or_equal(start_tick) {
            self.countdown_done = true;
            observer.countdown_ended();
            return;
        }

        let seconds = seconds_until(now, start_tick, self.tick_rate);
        if self.last_countdown != Some(seconds) {
            self.last_countdown = Some(seconds);
            observer.countdown_seconds_remaining(seconds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn countdown_is_derived_from_ticks() {
        let mut view = ClientView::new(10);
        let mut observer = ObserverQueue::new();
        view.apply(&ServerMsg::GameStartTick { tick: Tick::new(30) }, &mut observer);

        for tick in 5..=32u32 {
            view.update(Tick::new(tick), &mut observer);
        }

        assert_eq!(
            observer.drain(),
            vec![
                ObserverEvent::CountdownSecondsRemaining(3),
                ObserverEvent::CountdownSecondsRemaining(2),
                ObserverEvent::CountdownSecondsRemaining(1),
                ObserverEvent::CountdownEnded,
            ]
        );
    }

    #[test]
    fn respawn_messages_reach_observer() {
        let mut view = ClientView::new(60);
        let mut observer = ObserverQueue::new();
        view.apply(&ServerMsg::PlayersRemainingToStart { value: 1 }, &mut observer);
        view.apply(&ServerMsg::RespawnCountdown { seconds: 4 }, &mut observer);
        view.apply(&ServerMsg::Respawned, &mut observer);

        assert_eq!(
            observer.drain(),
            vec![
                ObserverEvent::PlayersRemainingToStart(1),
                ObserverEvent::RespawnSecondsRemaining(4),
                ObserverEvent::RespawnCompleted,
            ]
        );
    }

    #[test]
    fn local_inputs_forward_fill() {
        let mut view = ClientView::new(60);
        let msg = view.record_input(Tick::new(8), PlayerInput::new(Vec2::new(0.0, 1.0), true));
        assert!(matches!(msg, ClientMsg::Input { sprint: true, .. }));
        assert!(view.input_at(Tick::new(12)).sprint);
        assert_eq!(view.input_at(Tick::new(7)), PlayerInput::default());
    }
}
