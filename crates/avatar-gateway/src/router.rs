//! Axum router construction for the control API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with permissive CORS so browser overlays on other origins can call it.
//! Every matched route is timed by [`metrics::track_metrics`].

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::metrics;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the relay.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /healthcheck` -- liveness probe
/// - `GET /ws` -- live client connection
/// - `GET /api/state` -- current avatar state
/// - `GET /api/status` -- uptime, clients, reset timer
/// - `POST /api/emotion`, `/api/animation`, `/api/audio` -- mutations
/// - `POST /api/reload` -- reload every live client
/// - `GET /metrics` -- Prometheus text exposition
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/healthcheck", get(handlers::healthcheck))
        // Live clients
        .route("/ws", get(ws::ws_live))
        // Reads
        .route("/api/state", get(handlers::get_state))
        .route("/api/status", get(handlers::status))
        // Mutations
        .route("/api/emotion", post(handlers::set_emotion))
        .route("/api/animation", post(handlers::set_animation))
        .route("/api/audio", post(handlers::set_audio))
        .route("/api/reload", post(handlers::reload))
        .route("/metrics", get(handlers::metrics))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            metrics::track_metrics,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
