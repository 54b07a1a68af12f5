//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::components::{EntityKind, NetworkId, PlayerInput, TeamAffiliation};
use crate::game::events::SimEvent;
use crate::game::tick::Tick;
use crate::game::world::Entity;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Ask to be placed in the game
    RequestGameEntry,

    /// Movement intent for one tick
    Input {
        /// Tick the intent applies to
        tick: Tick,
        move_x: f32,
        move_y: f32,
        sprint: bool,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

impl ClientMsg {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }

    /// Sanitized input carried by an `Input` message
    pub fn player_input(&self) -> Option<(Tick, PlayerInput)> {
        match self {
            ClientMsg::Input {
                tick,
                move_x,
                move_y,
                sprint,
            } => Some((*tick, PlayerInput::new(Vec2::new(*move_x, *move_y), *sprint))),
            _ => None,
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        network_id: NetworkId,
        match_id: Uuid,
        tick_rate: u32,
    },

    /// Joined players still missing before the countdown starts
    PlayersRemainingToStart { value: u32 },

    /// Play begins at this tick
    GameStartTick { tick: Tick },

    /// Game state snapshot (sent at regular intervals)
    Snapshot {
        /// Server tick number
        tick: Tick,
        entities: Vec<EntitySnapshot>,
    },

    /// Whole seconds until the recipient respawns
    RespawnCountdown { seconds: i32 },

    /// The recipient's player is back
    Respawned,

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMsg::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl From<SimEvent> for ServerMsg {
    fn from(event: SimEvent) -> Self {
        match event {
            SimEvent::PlayersRemainingToStart { value } => ServerMsg::PlayersRemainingToStart { value },
            SimEvent::GameStartTick { tick } => ServerMsg::GameStartTick { tick },
            SimEvent::RespawnCountdown { seconds } => ServerMsg::RespawnCountdown { seconds },
            SimEvent::Respawned => ServerMsg::Respawned,
        }
    }
}

/// One replicated entity in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: Entity,
    pub kind: EntityKind,
    pub team: TeamAffiliation,
    pub position: Vec3,
    pub rotation: Quat,
    /// Never below zero
    pub hit_points: Option<i32>,
    pub max_hit_points: Option<i32>,
    /// Owning connection for player avatars
    pub owner: Option<NetworkId>,
}

/// Wire format errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid message: {0}")]
    Decode(serde_json::Error),

    #[error("Failed to encode message: {0}")]
    Encode(serde_json::Error),
}
