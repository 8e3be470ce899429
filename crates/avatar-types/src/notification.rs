//! Change notifications emitted by the state core.
//!
//! A [`Notification`] is emitted once per successful mutating call, after
//! the field is committed. Listeners subscribe by [`NotificationKind`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Animation, Emotion};

/// Discriminant of a [`Notification`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// See [`Notification::EmotionChange`].
    EmotionChange,
    /// See [`Notification::AnimationChange`].
    AnimationChange,
    /// See [`Notification::AudioChange`].
    AudioChange,
    /// See [`Notification::StateReset`].
    StateReset,
}

impl NotificationKind {
    /// Every kind, in the order the core declares them.
    pub const ALL: [Self; 4] = [
        Self::EmotionChange,
        Self::AnimationChange,
        Self::AudioChange,
        Self::StateReset,
    ];

    /// Event name as it appears in logs and on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmotionChange => "emotion_change",
            Self::AnimationChange => "animation_change",
            Self::AudioChange => "audio_change",
            Self::StateReset => "state_reset",
        }
    }
}

/// A committed change to the avatar state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Notification {
    /// The emotion was set.
    EmotionChange {
        /// The new emotion.
        emotion: Emotion,
    },
    /// The animation was set.
    AnimationChange {
        /// The new animation.
        animation: Animation,
    },
    /// The audio cue was set or cleared.
    AudioChange {
        /// The new cue, `None` when cleared.
        #[serde(rename = "audioCue")]
        audio_cue: Option<String>,
    },
    /// The avatar returned to its resting state. The audio cue is always
    /// cleared by a reset and is not carried.
    StateReset {
        /// Always [`Emotion::Neutral`].
        emotion: Emotion,
        /// Always [`Animation::None`].
        animation: Animation,
    },
}

impl Notification {
    /// The subscription key for this notification.
    pub const fn kind(&self) -> NotificationKind {
        match self {
            Self::EmotionChange { .. } => NotificationKind::EmotionChange,
            Self::AnimationChange { .. } => NotificationKind::AnimationChange,
            Self::AudioChange { .. } => NotificationKind::AudioChange,
            Self::StateReset { .. } => NotificationKind::StateReset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let reset = Notification::StateReset {
            emotion: Emotion::Neutral,
            animation: Animation::None,
        };
        assert_eq!(reset.kind(), NotificationKind::StateReset);
        assert_eq!(reset.kind().as_str(), "state_reset");

        let audio = Notification::AudioChange { audio_cue: None };
        assert_eq!(audio.kind(), NotificationKind::AudioChange);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let n = Notification::EmotionChange {
            emotion: Emotion::Surprised,
        };
        let json = serde_json::to_value(&n).unwrap_or_default();
        assert_eq!(json["kind"], "emotion_change");
        assert_eq!(json["emotion"], "surprised");
    }

    #[test]
    fn kind_names_match_serde_names() {
        for kind in NotificationKind::ALL {
            let json = serde_json::to_string(&kind).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
