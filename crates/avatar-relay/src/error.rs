//! Error types for the relay binary.
//!
//! [`RelayError`] is the top-level error type that wraps all possible
//! failure modes during startup and serving.

/// Top-level error for the relay binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: avatar_core::ConfigError,
    },

    /// The state machine could not be created.
    #[error("state error: {source}")]
    State {
        /// The underlying state error.
        #[from]
        source: avatar_core::StateError,
    },

    /// The control API state could not be built.
    #[error("gateway error: {source}")]
    Gateway {
        /// The underlying gateway error.
        #[from]
        source: avatar_gateway::GatewayError,
    },

    /// NATS connection or messaging failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },

    /// The control API server failed.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: avatar_gateway::ServerError,
    },
}
