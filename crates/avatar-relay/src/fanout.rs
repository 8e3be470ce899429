//! Notification fan-out.
//!
//! One listener per [`NotificationKind`] is registered on the state
//! machine at startup. Each forwards the notification to every live client
//! as a [`LiveEvent`] and, when a [`Republisher`] is configured, queues the
//! committed value for the bus publisher task.
//!
//! Resets reach live clients only. They are never republished.

use std::sync::Arc;

use avatar_core::config::BusConfig;
use avatar_core::{AvatarStateMachine, ListenerId};
use avatar_gateway::AppState;
use avatar_types::{LiveEvent, Notification, NotificationKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A message waiting to be published on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// Destination subject.
    pub subject: String,
    /// JSON payload.
    pub payload: Vec<u8>,
}

/// Queues committed values for republishing on `<topic>/state`.
///
/// The queue is unbounded so the listener never blocks inside the state
/// machine's critical section. Order of enqueue is order of commit.
#[derive(Debug, Clone)]
pub struct Republisher {
    tx: mpsc::UnboundedSender<Outbound>,
    emotion_subject: String,
    animation_subject: String,
    audio_subject: String,
}

impl Republisher {
    /// Build a republisher for the topics in `bus`, feeding `tx`.
    pub fn new(bus: &BusConfig, tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            tx,
            emotion_subject: BusConfig::state_topic(&bus.emotion_topic),
            animation_subject: BusConfig::state_topic(&bus.animation_topic),
            audio_subject: BusConfig::state_topic(&bus.audio_topic),
        }
    }

    /// The bus message for `notification`, or `None` for kinds that are
    /// not republished.
    pub fn outbound(&self, notification: &Notification) -> Option<Outbound> {
        let (subject, body) = match notification {
            Notification::EmotionChange { emotion } => (
                &self.emotion_subject,
                serde_json::json!({ "emotion": emotion.as_str() }),
            ),
            Notification::AnimationChange { animation } => (
                &self.animation_subject,
                serde_json::json!({ "animation": animation.as_str() }),
            ),
            Notification::AudioChange { audio_cue } => (
                &self.audio_subject,
                serde_json::json!({ "url": audio_cue }),
            ),
            Notification::StateReset { .. } => return None,
        };
        Some(Outbound {
            subject: subject.clone(),
            payload: body.to_string().into_bytes(),
        })
    }

    fn enqueue(&self, notification: &Notification) {
        let Some(message) = self.outbound(notification) else {
            return;
        };
        if self.tx.send(message).is_err() {
            warn!(
                kind = notification.kind().as_str(),
                "Bus publisher stopped, dropping republish"
            );
        }
    }
}

/// Register the fan-out listeners on `machine`.
///
/// Returns the listener ids in registration order.
pub fn register(
    machine: &AvatarStateMachine,
    state: &Arc<AppState>,
    republisher: Option<&Republisher>,
) -> Vec<ListenerId> {
    NotificationKind::ALL
        .iter()
        .map(|&kind| {
            let state = Arc::clone(state);
            let republisher = republisher.cloned();
            machine.subscribe(kind, move |notification: &Notification| {
                let receivers = state.broadcast(LiveEvent::from(notification));
                debug!(kind = kind.as_str(), receivers, "Live event sent");
                if let Some(r) = &republisher {
                    r.enqueue(notification);
                }
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use avatar_core::DEFAULT_ACTIVITY_TIMEOUT;
    use avatar_types::{Animation, Emotion};
    use tokio::sync::mpsc::error::TryRecvError;

    fn setup(
        republish: bool,
    ) -> (
        AvatarStateMachine,
        Arc<AppState>,
        Option<mpsc::UnboundedReceiver<Outbound>>,
    ) {
        let machine = AvatarStateMachine::with_handle(
            DEFAULT_ACTIVITY_TIMEOUT,
            tokio::runtime::Handle::current(),
        );
        let state = Arc::new(AppState::new(machine.clone()).unwrap());
        let (republisher, rx) = if republish {
            let (tx, rx) = mpsc::unbounded_channel();
            (Some(Republisher::new(&BusConfig::default(), tx)), Some(rx))
        } else {
            (None, None)
        };
        let ids = register(&machine, &state, republisher.as_ref());
        assert_eq!(ids.len(), 4);
        (machine, state, rx)
    }

    fn payload(message: &Outbound) -> serde_json::Value {
        serde_json::from_slice(&message.payload).unwrap()
    }

    #[tokio::test]
    async fn mutations_reach_live_clients_in_order() {
        let (machine, state, _) = setup(false);
        let mut client = state.subscribe();

        machine.apply_emotion(Emotion::Happy);
        machine.apply_animation(Animation::Dancing);
        machine.set_audio_cue(Some("http://x/a.mp3"));
        machine.reset_to_neutral();

        assert_eq!(
            client.recv().await.unwrap(),
            LiveEvent::SetEmotion {
                emotion: Emotion::Happy
            }
        );
        assert_eq!(
            client.recv().await.unwrap(),
            LiveEvent::SetAnimation {
                animation: Animation::Dancing
            }
        );
        assert_eq!(
            client.recv().await.unwrap(),
            LiveEvent::SetAudio {
                audio_url: Some(String::from("http://x/a.mp3"))
            }
        );
        assert_eq!(
            client.recv().await.unwrap(),
            LiveEvent::StateReset {
                emotion: Emotion::Neutral,
                animation: Animation::None
            }
        );
    }

    #[tokio::test]
    async fn rejected_value_broadcasts_nothing() {
        let (machine, state, rx) = setup(true);
        let mut client = state.subscribe();
        let mut rx = rx.unwrap();

        assert!(machine.set_emotion("not_a_real_emotion").is_err());

        assert!(client.try_recv().is_err());
        assert_eq!(rx.try_recv().err(), Some(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn changes_are_republished_on_state_topics() {
        let (machine, _state, rx) = setup(true);
        let mut rx = rx.unwrap();

        machine.apply_emotion(Emotion::Sad);
        machine.apply_animation(Animation::Dancing);
        machine.set_audio_cue(Some("http://x/a.mp3"));
        machine.set_audio_cue(None);

        let emotion = rx.try_recv().unwrap();
        assert_eq!(emotion.subject, "avatar/emotion/state");
        assert_eq!(payload(&emotion), serde_json::json!({ "emotion": "sad" }));

        let animation = rx.try_recv().unwrap();
        assert_eq!(animation.subject, "avatar/animation/state");
        assert_eq!(
            payload(&animation),
            serde_json::json!({ "animation": "silly_dancing" })
        );

        let audio = rx.try_recv().unwrap();
        assert_eq!(audio.subject, "avatar/audio/state");
        assert_eq!(
            payload(&audio),
            serde_json::json!({ "url": "http://x/a.mp3" })
        );

        let cleared = rx.try_recv().unwrap();
        assert_eq!(cleared.subject, "avatar/audio/state");
        assert_eq!(payload(&cleared), serde_json::json!({ "url": null }));
    }

    #[tokio::test]
    async fn resets_are_not_republished() {
        let (machine, state, rx) = setup(true);
        let mut client = state.subscribe();
        let mut rx = rx.unwrap();

        machine.reset_to_neutral();

        assert!(matches!(
            client.recv().await.ok(),
            Some(LiveEvent::StateReset { .. })
        ));
        assert_eq!(rx.try_recv().err(), Some(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn closed_queue_does_not_disturb_live_clients() {
        let (machine, state, rx) = setup(true);
        drop(rx);
        let mut client = state.subscribe();

        machine.apply_emotion(Emotion::Angry);

        assert_eq!(
            client.recv().await.unwrap(),
            LiveEvent::SetEmotion {
                emotion: Emotion::Angry
            }
        );
        assert_eq!(machine.get_state().emotion, Emotion::Angry);
    }

    #[test]
    fn custom_topics_follow_config() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let bus = BusConfig {
            emotion_topic: String::from("studio/face"),
            ..BusConfig::default()
        };
        let republisher = Republisher::new(&bus, tx);
        let message = republisher.outbound(&Notification::EmotionChange {
            emotion: Emotion::Surprised,
        });
        assert_eq!(message.unwrap().subject, "studio/face/state");
    }
}
