//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.config.client_origin))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Comma-separated origins; `*` (or nothing parseable) allows any origin
fn allowed_origins(client_origin: &str) -> AllowOrigin {
    if client_origin.trim() == "*" {
        return AllowOrigin::any();
    }

    let origins: Vec<HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub active_matches: usize,
    pub active_players: usize,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_matches: state.match_registry.active_matches(),
        active_players: state.match_registry.total_players(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, SimConfig};

    fn test_state() -> AppState {
        let config = Config {
            server_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "info".to_string(),
            sim_config_path: None,
            match_seed: Some(7),
            log_json: false,
            client_origin: "*".to_string(),
        };
        AppState::new(config, SimConfig::default())
    }

    #[tokio::test]
    async fn health_reports_registry_counts() {
        let state = test_state();
        state
            .match_registry
            .find_open_or_create(&state.sim_config, state.config.match_seed);

        let Json(health) = health_handler(State(state)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.active_matches, 1);
        assert_eq!(health.active_players, 0);
    }

    #[test]
    fn router_builds_with_origin_list() {
        let mut state = test_state();
        let mut config = (*state.config).clone();
        config.client_origin = "http://localhost:5173, https://arena.example".to_string();
        state.config = std::sync::Arc::new(config);
        let _router = build_router(state);
    }
}
