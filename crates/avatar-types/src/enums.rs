//! Closed value domains for the avatar.
//!
//! Each enumeration is the complete set of values the avatar client knows
//! how to render. Membership is the only validation rule: a string either
//! names a variant exactly (case-sensitive, as sent on the wire) or it is
//! rejected with [`InvalidDomainValue`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::InvalidDomainValue;

// ---------------------------------------------------------------------------
// Domain tag
// ---------------------------------------------------------------------------

/// Identifies which value domain a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// The [`Emotion`] domain.
    Emotion,
    /// The [`Animation`] domain.
    Animation,
    /// The [`GazeDirection`] domain.
    GazeDirection,
}

impl Domain {
    /// Wire name of the domain, used in error messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Emotion => "emotion",
            Self::Animation => "animation",
            Self::GazeDirection => "gaze direction",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Emotion
// ---------------------------------------------------------------------------

/// Facial expression shown by the avatar.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Emotion {
    /// Resting expression. The avatar starts and resets here.
    #[default]
    Neutral,
    /// Smiling.
    Happy,
    /// Downcast.
    Sad,
    /// Frowning.
    Angry,
    /// Wide-eyed.
    Surprised,
}

impl Emotion {
    /// Every member of the domain, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Neutral,
        Self::Happy,
        Self::Sad,
        Self::Angry,
        Self::Surprised,
    ];

    /// Wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Surprised => "surprised",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = InvalidDomainValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| InvalidDomainValue::new(Domain::Emotion, s))
    }
}

// ---------------------------------------------------------------------------
// Animation
// ---------------------------------------------------------------------------

/// Body animation played by the avatar.
///
/// `Angry` and `Neutral` share names with [`Emotion`] members but are
/// separate values: they select animation clips, not expressions.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Animation {
    /// No animation playing. The avatar starts and resets here.
    #[default]
    None,
    /// Dance loop.
    #[serde(rename = "silly_dancing")]
    Dancing,
    /// Stomping, arms-crossed clip.
    Angry,
    /// Idle breathing clip.
    Neutral,
    /// Head turn to the avatar's left.
    LookLeft,
    /// Head turn to the avatar's right.
    LookRight,
}

impl Animation {
    /// Every member of the domain, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::None,
        Self::Dancing,
        Self::Angry,
        Self::Neutral,
        Self::LookLeft,
        Self::LookRight,
    ];

    /// Wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Dancing => "silly_dancing",
            Self::Angry => "angry",
            Self::Neutral => "neutral",
            Self::LookLeft => "look_left",
            Self::LookRight => "look_right",
        }
    }
}

impl fmt::Display for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Animation {
    type Err = InvalidDomainValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| InvalidDomainValue::new(Domain::Animation, s))
    }
}

// ---------------------------------------------------------------------------
// Gaze direction
// ---------------------------------------------------------------------------

/// Direction the avatar looks in.
///
/// Exported for clients; the state core does not store or transition it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum GazeDirection {
    /// Straight at the viewer.
    #[default]
    Forward,
    /// Up.
    Up,
    /// Down.
    Down,
    /// Left.
    Left,
    /// Right.
    Right,
}

impl GazeDirection {
    /// Every member of the domain, in declaration order.
    pub const ALL: [Self; 5] = [Self::Forward, Self::Up, Self::Down, Self::Left, Self::Right];

    /// Wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for GazeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GazeDirection {
    type Err = InvalidDomainValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| InvalidDomainValue::new(Domain::GazeDirection, s))
    }
}
