//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::app::AppState;
use crate::config::Config;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Plain HTTP requests that take longer than this are cut off
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler));

    if let Some(dir) = &state.config.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for the configured origins, or any origin when none are set
fn cors_layer(config: &Config) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if config.client_origins.is_empty() {
        return base.allow_origin(Any);
    }

    let allowed_origins: Vec<HeaderValue> = config
        .client_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(allowed_origins)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    tick: u64,
    active_players: usize,
    snapshots_sent: u64,
    avg_players_per_snapshot: f32,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.arena.snapshot_stats.lock().clone();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        tick: state.arena.tick(),
        active_players: state.arena.player_count(),
        snapshots_sent: stats.total_snapshots,
        avg_players_per_snapshot: stats.avg_players_per_snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn state() -> (AppState, crate::game::TickScheduler) {
        let vars: HashMap<&str, &str> = HashMap::from([("WORLD_SEED", "5")]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        AppState::new(config)
    }

    #[tokio::test]
    async fn health_reports_arena_counters() {
        let (state, mut scheduler) = state();
        let (_id, _outbound) = state.arena.sessions.connect("Ada".into(), Default::default());
        scheduler.step(0);
        scheduler.step(16);

        let Json(health) = health_handler(State(state)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.tick, 2);
        assert_eq!(health.active_players, 1);
        assert_eq!(health.snapshots_sent, 2);

        let value = serde_json::to_value(&health).unwrap();
        assert!(value.get("avgPlayersPerSnapshot").is_some());
        assert!(value.get("uptimeSecs").is_some());
    }

    #[test]
    fn router_builds_with_and_without_static_dir() {
        let (state, _scheduler) = state();
        let _ = build_router(state.clone());

        let mut config = (*state.config).clone();
        config.static_dir = Some("public".into());
        config.client_origins = vec!["https://arena.example".into()];
        let _ = build_router(AppState {
            config: std::sync::Arc::new(config),
            arena: state.arena,
        });
    }
}
