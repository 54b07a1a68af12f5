//! Game simulation modules

pub mod archetypes;
pub mod combat;
pub mod command_buffer;
pub mod components;
pub mod deferred;
pub mod events;
pub mod lifecycle;
pub mod r#match;
pub mod movement;
pub mod physics;
pub mod respawn;
pub mod simulation;
pub mod snapshot;
pub mod spawner;
pub mod state;
pub mod targeting;
pub mod tick;
pub mod world;

pub use r#match::{Addressed, GameMatch, MatchError, MatchHandle, MatchRegistry};
pub use simulation::{SimInput, Simulation};
pub use state::GamePhase;
pub use tick::{Tick, TickClock};
