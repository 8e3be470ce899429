//! The avatar state snapshot.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Animation, Emotion};

/// Point-in-time copy of the avatar's observable state.
///
/// The default value is the resting state: neutral expression, no
/// animation, no audio cue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AvatarState {
    /// Current expression.
    pub emotion: Emotion,
    /// Current animation clip.
    pub animation: Animation,
    /// Reference (URL) of the audio clip to play, if any. Never empty.
    pub audio_cue: Option<String>,
}

impl AvatarState {
    /// Whether this snapshot equals the resting state.
    pub fn is_resting(&self) -> bool {
        self.emotion == Emotion::Neutral
            && self.animation == Animation::None
            && self.audio_cue.is_none()
    }
}
