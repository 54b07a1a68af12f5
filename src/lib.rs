//! Arena Server - authoritative fixed-tick simulation for a multiplayer arena
//!
//! The `game` module holds the deterministic simulation and the tokio match
//! loop that drives it; `ws` and `http` expose matches to clients; `client`
//! is the client-side view that turns server messages into UI callbacks.

pub mod app;
pub mod client;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
