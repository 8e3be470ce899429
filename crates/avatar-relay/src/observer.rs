//! Logging observer.
//!
//! The state machine does no logging of its own. This listener is
//! registered for every notification kind and records each committed
//! change at `info`.

use avatar_core::{AvatarStateMachine, ListenerId};
use avatar_types::Notification;
use tracing::info;

/// Log one notification.
fn log_notification(notification: &Notification) {
    match notification {
        Notification::EmotionChange { emotion } => {
            info!(%emotion, "Emotion changed");
        }
        Notification::AnimationChange { animation } => {
            info!(%animation, "Animation changed");
        }
        Notification::AudioChange { audio_cue } => {
            info!(audio_cue = ?audio_cue, "Audio cue changed");
        }
        Notification::StateReset { emotion, animation } => {
            info!(%emotion, %animation, "Avatar reset to rest");
        }
    }
}

/// Register the logging observer on `machine`.
pub fn register(machine: &AvatarStateMachine) -> ListenerId {
    machine.subscribe_all(log_notification)
}
