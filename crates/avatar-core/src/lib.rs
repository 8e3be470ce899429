//! State core for the avatar state relay.
//!
//! The [`AvatarStateMachine`] is the sole owner of the avatar's state. It
//! validates and applies transitions, emits a [`Notification`] to every
//! registered listener for each committed change, and reverts the avatar
//! to its resting state after a period of inactivity.
//!
//! The core knows nothing about HTTP, the message bus, or live
//! connections: transports call its setters and subscribe to its
//! notifications.
//!
//! # Modules
//!
//! - [`machine`] -- The state machine and its inactivity timer
//! - [`listeners`] -- Ordered listener registry
//! - [`config`] -- Typed relay configuration (YAML + environment)
//! - [`error`] -- Core error type
//!
//! [`Notification`]: avatar_types::Notification

pub mod config;
pub mod error;
pub mod listeners;
pub mod machine;

pub use config::{ConfigError, RelayConfig};
pub use error::StateError;
pub use listeners::{Listener, ListenerId};
pub use machine::{AvatarStateMachine, DEFAULT_ACTIVITY_TIMEOUT};
