//! Error types for the state core.

use avatar_types::InvalidDomainValue;

/// Errors returned by [`AvatarStateMachine`](crate::AvatarStateMachine).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// The value is not a member of the emotion or animation domain. The
    /// state was not touched and no notification was emitted.
    #[error(transparent)]
    InvalidDomainValue(#[from] InvalidDomainValue),

    /// The state machine was created outside a Tokio runtime, so the
    /// inactivity timer has nowhere to run.
    #[error("no Tokio runtime available for the inactivity timer")]
    NoRuntime,
}
