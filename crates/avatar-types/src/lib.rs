//! Shared type definitions for the avatar state relay.
//!
//! This crate is the single source of truth for the values that travel
//! between the state core, the HTTP control API, the message bus, and the
//! live-connection clients. Types flow downstream to `TypeScript` via
//! `ts-rs` for the browser avatar client.
//!
//! # Modules
//!
//! - [`enums`] -- Closed value domains (emotion, animation, gaze direction)
//! - [`state`] -- The [`AvatarState`] snapshot
//! - [`notification`] -- Change notifications emitted by the state core
//! - [`live`] -- Frames exchanged with live-connection clients
//! - [`error`] -- Domain validation error

pub mod enums;
pub mod error;
pub mod live;
pub mod notification;
pub mod state;

// Re-export all public types at crate root for convenience.
pub use enums::{Animation, Domain, Emotion, GazeDirection};
pub use error::InvalidDomainValue;
pub use live::{LiveCommand, LiveEvent};
pub use notification::{Notification, NotificationKind};
pub use state::AvatarState;
