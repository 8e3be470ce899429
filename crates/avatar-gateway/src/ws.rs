//! `WebSocket` handler for live avatar clients.
//!
//! Clients connect to `GET /ws` and receive a JSON-encoded
//! [`LiveEvent`] frame each time the state changes or a reload is
//! requested. The handler uses a [`broadcast::Receiver`] so all connected
//! clients see the same stream.
//!
//! Clients may also send [`LiveCommand`] frames. Malformed frames and
//! rejected values are ignored; the client gets no reply.
//!
//! If a client falls behind, lagged messages are silently skipped and
//! the client resumes from the most recent event.
//!
//! [`broadcast::Receiver`]: tokio::sync::broadcast::Receiver

use std::sync::Arc;

use avatar_core::{AvatarStateMachine, StateError};
use avatar_types::LiveCommand;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_live(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Apply a parsed client command to the state machine.
///
/// # Errors
///
/// Returns [`StateError::InvalidDomainValue`] if the value is rejected.
pub fn apply_command(machine: &AvatarStateMachine, command: &LiveCommand) -> Result<(), StateError> {
    match command {
        LiveCommand::SetEmotion { emotion } => machine.set_emotion(emotion),
        LiveCommand::SetAnimation { animation } => machine.set_animation(animation),
        LiveCommand::SetAudio { audio_url } => {
            machine.set_audio_cue(audio_url.as_deref());
            Ok(())
        }
    }
}

/// Parse and apply one inbound text frame, ignoring anything invalid.
fn handle_client_text(machine: &AvatarStateMachine, conn: Uuid, text: &str) {
    let command: LiveCommand = match serde_json::from_str(text) {
        Ok(c) => c,
        Err(e) => {
            debug!(%conn, error = %e, "Ignoring malformed live frame");
            return;
        }
    };
    if let Err(e) = apply_command(machine, &command) {
        debug!(%conn, error = %e, "Ignoring rejected live command");
    }
}

/// Handle the `WebSocket` lifecycle: subscribe to the broadcast channel,
/// forward each event as a text frame, and apply inbound commands.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let conn = Uuid::now_v7();
    debug!(%conn, "WebSocket client connected");

    let mut rx = state.subscribe();

    loop {
        tokio::select! {
            // Receive an event from the fan-out.
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!(%conn, "Failed to serialize live event: {e}");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            debug!(%conn, "WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(%conn, skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!(%conn, "Broadcast channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            // Client frames: commands, pings, close.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%conn, "WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Text(text))) => {
                        handle_client_text(&state.machine, conn, text.as_str());
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%conn, "WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%conn, "WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // Binary and pong frames carry nothing for us.
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatar_core::DEFAULT_ACTIVITY_TIMEOUT;
    use avatar_types::{Animation, Emotion};

    fn machine() -> AvatarStateMachine {
        AvatarStateMachine::with_handle(DEFAULT_ACTIVITY_TIMEOUT, tokio::runtime::Handle::current())
    }

    #[tokio::test]
    async fn valid_frames_mutate_state() {
        let m = machine();
        let conn = Uuid::now_v7();

        handle_client_text(&m, conn, r#"{"event":"set_emotion","data":{"emotion":"sad"}}"#);
        handle_client_text(&m, conn, r#"{"event":"set_animation","data":{"animation":"look_left"}}"#);
        handle_client_text(&m, conn, r#"{"event":"set_audio","data":{"audioUrl":"http://x/c.mp3"}}"#);

        let s = m.get_state();
        assert_eq!(s.emotion, Emotion::Sad);
        assert_eq!(s.animation, Animation::LookLeft);
        assert_eq!(s.audio_cue.as_deref(), Some("http://x/c.mp3"));
    }

    #[tokio::test]
    async fn malformed_and_invalid_frames_are_ignored() {
        let m = machine();
        let conn = Uuid::now_v7();

        handle_client_text(&m, conn, "not json");
        handle_client_text(&m, conn, r#"{"event":"set_emotion","data":{}}"#);
        handle_client_text(&m, conn, r#"{"event":"set_emotion","data":{"emotion":"giddy"}}"#);
        handle_client_text(&m, conn, r#"{"event":"state_reset","data":{}}"#);

        assert!(m.get_state().is_resting());
        assert!(!m.has_pending_reset());
    }

    #[tokio::test]
    async fn apply_command_reports_domain_errors() {
        let m = machine();
        let result = apply_command(
            &m,
            &LiveCommand::SetAnimation {
                animation: String::from("dagger"),
            },
        );
        assert!(matches!(result, Err(StateError::InvalidDomainValue(_))));
    }
}
