//! REST endpoint handlers for the control API.
//!
//! Mutating handlers parse the body, hand the raw value to the state
//! machine, and translate domain rejections into `400` responses. Nothing
//! is broadcast from here except `reload_page`: state changes reach live
//! clients through the fan-out listener.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/healthcheck` | Liveness probe |
//! | `GET` | `/api/state` | Current avatar state |
//! | `GET` | `/api/status` | Uptime, clients, timer |
//! | `POST` | `/api/emotion` | Set emotion |
//! | `POST` | `/api/animation` | Set animation |
//! | `POST` | `/api/audio` | Set or clear the audio cue |
//! | `POST` | `/api/reload` | Ask live clients to reload |
//! | `GET` | `/metrics` | Prometheus request metrics |

use std::sync::Arc;

use avatar_types::{AvatarState, LiveEvent};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use tracing::{debug, info};

use crate::error::GatewayError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/emotion`.
#[derive(Debug, serde::Deserialize)]
pub struct EmotionRequest {
    /// Candidate emotion, validated by the state machine.
    pub emotion: String,
}

/// Request body for `POST /api/animation`.
#[derive(Debug, serde::Deserialize)]
pub struct AnimationRequest {
    /// Candidate animation, validated by the state machine.
    pub animation: String,
}

/// Request body for `POST /api/audio`.
#[derive(Debug, serde::Deserialize)]
pub struct AudioRequest {
    /// Clip URL. Missing, `null`, or empty clears the cue.
    #[serde(rename = "audioUrl", alias = "audio_url", default)]
    pub audio_url: Option<String>,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct SuccessResponse {
    /// Always `"success"`.
    status: &'static str,
}

const SUCCESS: SuccessResponse = SuccessResponse { status: "success" };

/// Response body for `GET /api/status`.
#[derive(Debug, serde::Serialize)]
struct StatusResponse {
    uptime_seconds: u64,
    live_clients: usize,
    pending_reset: bool,
    activity_timeout_secs: u64,
    state: AvatarState,
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Set the avatar's emotion.
pub async fn set_emotion(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EmotionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(body) = body?;
    info!(emotion = %body.emotion, "Setting emotion");
    state.machine.set_emotion(&body.emotion)?;
    Ok(Json(SUCCESS))
}

/// Set the avatar's animation.
pub async fn set_animation(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnimationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(body) = body?;
    info!(animation = %body.animation, "Setting animation");
    state.machine.set_animation(&body.animation)?;
    Ok(Json(SUCCESS))
}

/// Set or clear the avatar's audio cue.
pub async fn set_audio(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AudioRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(body) = body?;
    info!(audio_url = ?body.audio_url, "Setting audio");
    state.machine.set_audio_cue(body.audio_url.as_deref());
    Ok(Json(SUCCESS))
}

/// Ask every live client to reload its page. Does not touch the state.
pub async fn reload(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let receivers = state.broadcast(LiveEvent::ReloadPage {});
    debug!(receivers, "Reload broadcast sent");
    Json(SUCCESS)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Liveness probe.
pub async fn healthcheck() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Current avatar state snapshot.
pub async fn get_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.machine.get_state())
}

/// Uptime, connected clients, and the inactivity timer.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatusResponse {
        uptime_seconds: state.uptime_seconds(),
        live_clients: state.live_clients(),
        pending_reset: state.machine.has_pending_reset(),
        activity_timeout_secs: state.machine.activity_timeout().as_secs(),
        state: state.machine.get_state(),
    })
}

/// Prometheus text exposition of the request metrics.
pub async fn metrics(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, GatewayError> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}

/// Serve a minimal HTML page showing the current state and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.machine.get_state();
    let emotion = snapshot.emotion;
    let animation = snapshot.animation;
    let audio = snapshot.audio_cue.as_deref().map_or_else(
        || String::from("&mdash;"),
        |url| url.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;"),
    );
    let clients = state.live_clients();
    let pending = if state.machine.has_pending_reset() {
        "armed"
    } else {
        "idle"
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Avatar Relay</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
    </style>
</head>
<body>
    <h1>Avatar Relay</h1>

    <div>
        <div class="metric"><div class="label">Emotion</div><div class="value">{emotion}</div></div>
        <div class="metric"><div class="label">Animation</div><div class="value">{animation}</div></div>
        <div class="metric"><div class="label">Audio</div><div class="value">{audio}</div></div>
        <div class="metric"><div class="label">Live clients</div><div class="value">{clients}</div></div>
        <div class="metric"><div class="label">Reset timer</div><div class="value">{pending}</div></div>
    </div>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET <a href="/api/state">/api/state</a></li>
        <li>GET <a href="/api/status">/api/status</a></li>
        <li>GET <a href="/healthcheck">/healthcheck</a></li>
        <li>GET <a href="/metrics">/metrics</a></li>
        <li>POST /api/emotion, /api/animation, /api/audio, /api/reload</li>
        <li>WS /ws</li>
    </ul>
</body>
</html>"#
    ))
}
