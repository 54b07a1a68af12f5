//! Application state shared across routes

use std::sync::Arc;

use crate::config::{Config, SimConfig};
use crate::game::MatchRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Tunables every new match starts from
    pub sim_config: Arc<SimConfig>,
    pub match_registry: Arc<MatchRegistry>,
}

impl AppState {
    pub fn new(config: Config, sim_config: SimConfig) -> Self {
        Self {
            config: Arc::new(config),
            sim_config: Arc::new(sim_config),
            match_registry: Arc::new(MatchRegistry::new()),
        }
    }
}
