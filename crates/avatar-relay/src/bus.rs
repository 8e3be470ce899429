//! NATS ingress and republish.
//!
//! The relay subscribes to the configured emotion, animation, audio, and
//! reload subjects. Each message carries a JSON payload with a single
//! field:
//!
//! | Subject | Payload |
//! |---------|---------|
//! | `avatar/emotion` | `{"emotion": "happy"}` |
//! | `avatar/animation` | `{"animation": "silly_dancing"}` |
//! | `avatar/audio` | `{"url": "http://..."}` (missing or `null` clears) |
//! | `avatar/reload` | anything |
//!
//! Messages that fail to parse, arrive on an unexpected subject, or carry
//! a value outside its domain are logged at `warn` and dropped. The state
//! is not touched.
//!
//! Committed changes go back out through [`run_publisher`], which drains
//! the queue filled by the fan-out listeners.

use std::sync::Arc;

use async_nats::Subscriber;
use avatar_core::config::BusConfig;
use avatar_core::{AvatarStateMachine, StateError};
use avatar_gateway::AppState;
use avatar_types::LiveEvent;
use futures::stream::{SelectAll, StreamExt as _};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::fanout::Outbound;

/// A parsed ingress message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusCommand {
    /// Candidate emotion.
    Emotion(String),
    /// Candidate animation.
    Animation(String),
    /// Audio clip URL, or `None` to clear.
    Audio(Option<String>),
    /// Reload every live client.
    Reload,
}

/// Reasons an ingress message is dropped.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The subject is not one the relay subscribed to.
    #[error("unknown subject {0:?}")]
    UnknownSubject(String),

    /// The payload is not valid JSON or lacks the expected field.
    #[error("malformed payload on {subject}: {source}")]
    MalformedPayload {
        /// Subject the message arrived on.
        subject: String,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// The value was rejected by the state machine.
    #[error(transparent)]
    State(#[from] StateError),
}

#[derive(Deserialize)]
struct EmotionPayload {
    emotion: String,
}

#[derive(Deserialize)]
struct AnimationPayload {
    animation: String,
}

#[derive(Deserialize)]
struct AudioPayload {
    #[serde(default)]
    url: Option<String>,
}

fn decode<'a, T: Deserialize<'a>>(subject: &str, payload: &'a [u8]) -> Result<T, BusError> {
    serde_json::from_slice(payload).map_err(|source| BusError::MalformedPayload {
        subject: subject.to_owned(),
        source,
    })
}

/// Parse a message received on `subject` into a [`BusCommand`].
///
/// # Errors
///
/// Returns [`BusError::UnknownSubject`] for subjects outside `bus`, and
/// [`BusError::MalformedPayload`] when the JSON does not match the subject.
pub fn parse_message(bus: &BusConfig, subject: &str, payload: &[u8]) -> Result<BusCommand, BusError> {
    if subject == bus.emotion_topic {
        let p: EmotionPayload = decode(subject, payload)?;
        Ok(BusCommand::Emotion(p.emotion))
    } else if subject == bus.animation_topic {
        let p: AnimationPayload = decode(subject, payload)?;
        Ok(BusCommand::Animation(p.animation))
    } else if subject == bus.audio_topic {
        let p: AudioPayload = decode(subject, payload)?;
        Ok(BusCommand::Audio(p.url))
    } else if subject == bus.reload_topic {
        Ok(BusCommand::Reload)
    } else {
        Err(BusError::UnknownSubject(subject.to_owned()))
    }
}

/// Apply a parsed command.
///
/// # Errors
///
/// Returns [`BusError::State`] if the state machine rejects the value.
pub fn dispatch(
    command: &BusCommand,
    machine: &AvatarStateMachine,
    state: &AppState,
) -> Result<(), BusError> {
    match command {
        BusCommand::Emotion(value) => machine.set_emotion(value)?,
        BusCommand::Animation(value) => machine.set_animation(value)?,
        BusCommand::Audio(url) => machine.set_audio_cue(url.as_deref()),
        BusCommand::Reload => {
            let receivers = state.broadcast(LiveEvent::ReloadPage {});
            debug!(receivers, "Reload broadcast sent");
        }
    }
    Ok(())
}

/// Parse and apply one message, logging and dropping anything invalid.
pub fn handle_message(
    bus: &BusConfig,
    machine: &AvatarStateMachine,
    state: &AppState,
    subject: &str,
    payload: &[u8],
) {
    let result = parse_message(bus, subject, payload)
        .and_then(|command| dispatch(&command, machine, state));
    if let Err(e) = result {
        warn!(subject, error = %e, "Dropping bus message");
    }
}

/// NATS client wrapper for the relay.
pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Nats`] if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, RelayError> {
        info!(url, "Connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| RelayError::Nats {
                message: format!("failed to connect to {url}: {e}"),
            })?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// A handle to the underlying client for the publisher task.
    pub fn client(&self) -> async_nats::Client {
        self.client.clone()
    }

    /// Subscribe to every ingress subject and merge them into one stream.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Nats`] if any subscription fails.
    pub async fn subscribe_ingress(
        &self,
        bus: &BusConfig,
    ) -> Result<SelectAll<Subscriber>, RelayError> {
        let mut subscribers = Vec::with_capacity(4);
        for subject in bus.ingress_topics() {
            let subscriber = self
                .client
                .subscribe(subject.to_owned())
                .await
                .map_err(|e| RelayError::Nats {
                    message: format!("failed to subscribe to {subject}: {e}"),
                })?;
            debug!(subject, "Subscribed");
            subscribers.push(subscriber);
        }
        info!(count = subscribers.len(), "Subscribed to ingress subjects");
        Ok(futures::stream::select_all(subscribers))
    }
}

impl std::fmt::Debug for NatsBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsBus")
            .field("state", &self.client.connection_state())
            .finish()
    }
}

/// Consume ingress messages until the subscriptions end.
pub async fn run_ingress(
    mut messages: SelectAll<Subscriber>,
    bus: BusConfig,
    machine: AvatarStateMachine,
    state: Arc<AppState>,
) {
    while let Some(message) = messages.next().await {
        handle_message(
            &bus,
            &machine,
            &state,
            message.subject.as_str(),
            &message.payload,
        );
    }
    info!("NATS ingress closed");
}

/// Publish queued messages in order until the queue closes.
///
/// Publish failures are logged and the message is dropped.
pub async fn run_publisher(client: async_nats::Client, mut rx: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(Outbound { subject, payload }) = rx.recv().await {
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            warn!(subject, error = %e, "Failed to publish state");
        }
    }
    debug!("Bus publisher stopped");
}
