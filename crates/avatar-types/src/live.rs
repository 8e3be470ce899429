//! Frames exchanged with live-connection clients.
//!
//! Every frame is a JSON object with an `event` name and a `data` object:
//!
//! ```json
//! {"event": "set_emotion", "data": {"emotion": "happy"}}
//! ```
//!
//! [`LiveEvent`] is what the relay pushes to clients. [`LiveCommand`] is
//! what clients may send back; its fields are raw strings so the state
//! core performs domain validation the same way for every ingress path.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Animation, Emotion};
use crate::notification::Notification;

/// An event broadcast to every connected live client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LiveEvent {
    /// Show a new expression.
    SetEmotion {
        /// The expression.
        emotion: Emotion,
    },
    /// Play a new animation.
    SetAnimation {
        /// The animation clip.
        animation: Animation,
    },
    /// Play (or stop, when `None`) an audio clip.
    SetAudio {
        /// Clip URL.
        #[serde(rename = "audioUrl")]
        audio_url: Option<String>,
    },
    /// Return to the resting pose.
    StateReset {
        /// Resting expression.
        emotion: Emotion,
        /// Resting animation.
        animation: Animation,
    },
    /// Reload the client page.
    ReloadPage {},
}

impl LiveEvent {
    /// Event name on the wire.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetEmotion { .. } => "set_emotion",
            Self::SetAnimation { .. } => "set_animation",
            Self::SetAudio { .. } => "set_audio",
            Self::StateReset { .. } => "state_reset",
            Self::ReloadPage {} => "reload_page",
        }
    }
}

impl From<&Notification> for LiveEvent {
    fn from(notification: &Notification) -> Self {
        match notification {
            Notification::EmotionChange { emotion } => Self::SetEmotion { emotion: *emotion },
            Notification::AnimationChange { animation } => Self::SetAnimation {
                animation: *animation,
            },
            Notification::AudioChange { audio_cue } => Self::SetAudio {
                audio_url: audio_cue.clone(),
            },
            Notification::StateReset { emotion, animation } => Self::StateReset {
                emotion: *emotion,
                animation: *animation,
            },
        }
    }
}

/// A mutation request sent by a live client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LiveCommand {
    /// Request an emotion change.
    SetEmotion {
        /// Candidate emotion, validated by the core.
        emotion: String,
    },
    /// Request an animation change.
    SetAnimation {
        /// Candidate animation, validated by the core.
        animation: String,
    },
    /// Request an audio cue change. A missing field clears the cue.
    SetAudio {
        /// Clip URL.
        #[serde(rename = "audioUrl", alias = "audio_url", default)]
        audio_url: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_notification_becomes_state_reset_frame() {
        let event = LiveEvent::from(&Notification::StateReset {
            emotion: Emotion::Neutral,
            animation: Animation::None,
        });
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json["event"], "state_reset");
        assert_eq!(json["data"]["emotion"], "neutral");
        assert_eq!(json["data"]["animation"], "none");
    }

    #[test]
    fn audio_frame_uses_audio_url_field() {
        let event = LiveEvent::from(&Notification::AudioChange {
            audio_cue: Some(String::from("http://x/a.mp3")),
        });
        assert_eq!(event.name(), "set_audio");
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json["data"]["audioUrl"], "http://x/a.mp3");
    }

    #[test]
    fn reload_frame_has_empty_data() {
        let json = serde_json::to_value(LiveEvent::ReloadPage {}).unwrap_or_default();
        assert_eq!(json, serde_json::json!({"event": "reload_page", "data": {}}));
    }

    #[test]
    fn command_keeps_unvalidated_values() {
        let raw = r#"{"event":"set_emotion","data":{"emotion":"ecstatic"}}"#;
        let cmd: Result<LiveCommand, _> = serde_json::from_str(raw);
        assert_eq!(
            cmd.ok(),
            Some(LiveCommand::SetEmotion {
                emotion: String::from("ecstatic")
            })
        );
    }

    #[test]
    fn audio_command_accepts_snake_case_alias_and_missing_field() {
        let snake = r#"{"event":"set_audio","data":{"audio_url":"http://x/b.mp3"}}"#;
        let cmd: Result<LiveCommand, _> = serde_json::from_str(snake);
        assert_eq!(
            cmd.ok(),
            Some(LiveCommand::SetAudio {
                audio_url: Some(String::from("http://x/b.mp3"))
            })
        );

        let empty = r#"{"event":"set_audio","data":{}}"#;
        let cmd: Result<LiveCommand, _> = serde_json::from_str(empty);
        assert_eq!(cmd.ok(), Some(LiveCommand::SetAudio { audio_url: None }));
    }

    #[test]
    fn unknown_event_is_a_parse_error() {
        let raw = r#"{"event":"set_gaze","data":{"gaze":"up"}}"#;
        assert!(serde_json::from_str::<LiveCommand>(raw).is_err());
    }
}
