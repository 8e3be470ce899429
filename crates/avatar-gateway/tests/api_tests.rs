//! Integration tests for the control API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic, routing, and
//! error mapping without needing a live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use avatar_core::{AvatarStateMachine, DEFAULT_ACTIVITY_TIMEOUT};
use avatar_gateway::router::build_router;
use avatar_gateway::state::AppState;
use avatar_types::{Animation, Emotion, LiveEvent};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use tower::ServiceExt;

fn make_test_state() -> Arc<AppState> {
    let machine =
        AvatarStateMachine::with_handle(DEFAULT_ACTIVITY_TIMEOUT, tokio::runtime::Handle::current());
    Arc::new(AppState::new(machine).unwrap())
}

async fn get(state: &Arc<AppState>, path: &str) -> Response {
    build_router(Arc::clone(state))
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(state: &Arc<AppState>, path: &str, body: &str) -> Response {
    build_router(Arc::clone(state))
        .oneshot(
            Request::post(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_owned()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =========================================================================
// Reads
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let state = make_test_state();
    let response = get(&state, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_index_escapes_audio_url() {
    let state = make_test_state();
    state.machine.set_audio_cue(Some("http://x/<b>.mp3"));

    let response = get(&state, "/").await;
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("http://x/&lt;b&gt;.mp3"));
    assert!(!html.contains("<b>"));
}

#[tokio::test]
async fn test_healthcheck() {
    let state = make_test_state();
    let response = get(&state, "/healthcheck").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_get_state_starts_at_rest() {
    let state = make_test_state();
    let response = get(&state, "/api/state").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["emotion"], "neutral");
    assert_eq!(json["animation"], "none");
    assert!(json["audioCue"].is_null());
}

#[tokio::test]
async fn test_status_reports_timer_and_clients() {
    let state = make_test_state();
    let _client = state.subscribe();

    let json = body_to_json(get(&state, "/api/status").await.into_body()).await;
    assert_eq!(json["live_clients"], 1);
    assert_eq!(json["pending_reset"], false);
    assert_eq!(json["activity_timeout_secs"], 30);

    state.machine.apply_emotion(Emotion::Happy);
    let json = body_to_json(get(&state, "/api/status").await.into_body()).await;
    assert_eq!(json["pending_reset"], true);
    assert_eq!(json["state"]["emotion"], "happy");
}

// =========================================================================
// Mutations
// =========================================================================

#[tokio::test]
async fn test_set_emotion_success() {
    let state = make_test_state();
    let response = post_json(&state, "/api/emotion", r#"{"emotion":"happy"}"#).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "success");
    assert_eq!(state.machine.get_state().emotion, Emotion::Happy);
    assert!(state.machine.has_pending_reset());
}

#[tokio::test]
async fn test_set_animation_uses_wire_name() {
    let state = make_test_state();
    let response = post_json(&state, "/api/animation", r#"{"animation":"silly_dancing"}"#).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.machine.get_state().animation, Animation::Dancing);
}

#[tokio::test]
async fn test_invalid_emotion_is_rejected_without_change() {
    let state = make_test_state();
    let response = post_json(&state, "/api/emotion", r#"{"emotion":"Happy"}"#).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);
    assert!(json["error"].as_str().unwrap().contains("Happy"));
    assert!(state.machine.get_state().is_resting());
    assert!(!state.machine.has_pending_reset());
}

#[tokio::test]
async fn test_invalid_animation_is_rejected() {
    let state = make_test_state();
    let response = post_json(&state, "/api/animation", r#"{"animation":"moonwalk"}"#).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.machine.get_state().animation, Animation::None);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let state = make_test_state();

    let response = post_json(&state, "/api/emotion", "{not json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(&state, "/api/emotion", r#"{"mood":"happy"}"#).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_set_audio_and_clear() {
    let state = make_test_state();

    let response = post_json(&state, "/api/audio", r#"{"audioUrl":"http://x/a.mp3"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        state.machine.get_state().audio_cue.as_deref(),
        Some("http://x/a.mp3")
    );

    let response = post_json(&state, "/api/audio", r#"{"audio_url":"http://x/b.mp3"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        state.machine.get_state().audio_cue.as_deref(),
        Some("http://x/b.mp3")
    );

    let response = post_json(&state, "/api/audio", "{}").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.machine.get_state().audio_cue, None);
}

#[tokio::test]
async fn test_reload_broadcasts_without_touching_state() {
    let state = make_test_state();
    let mut client = state.subscribe();

    let response = post_json(&state, "/api/reload", "{}").await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(client.recv().await.ok(), Some(LiveEvent::ReloadPage {}));
    assert!(state.machine.get_state().is_resting());
    assert!(!state.machine.has_pending_reset());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let state = make_test_state();
    let response = get(&state, "/api/gaze").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =========================================================================
// Metrics
// =========================================================================

#[tokio::test]
async fn test_metrics_record_request_durations() {
    let state = make_test_state();
    assert_eq!(get(&state, "/api/state").await.status(), StatusCode::OK);
    assert_eq!(
        post_json(&state, "/api/emotion", r#"{"emotion":"elated"}"#)
            .await
            .status(),
        StatusCode::BAD_REQUEST
    );

    let response = get(&state, "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(content_type.contains("text/plain"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("# TYPE http_request_duration_ms histogram"));
    assert!(text.contains(
        r#"http_request_duration_ms_count{code="200",method="GET",route="/api/state"} 1"#
    ));
    assert!(text.contains(
        r#"http_request_duration_ms_count{code="400",method="POST",route="/api/emotion"} 1"#
    ));
}

#[tokio::test]
async fn test_unmatched_paths_are_not_timed() {
    let state = make_test_state();
    assert_eq!(get(&state, "/api/gaze").await.status(), StatusCode::NOT_FOUND);

    let response = get(&state, "/metrics").await;
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!text.contains("/api/gaze"));
}
