//! Control API server for the avatar state relay.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **REST ingress** (`POST /api/emotion`, `/api/animation`, `/api/audio`,
//!   `/api/reload`) that validates request bodies and drives the
//!   [`AvatarStateMachine`](avatar_core::AvatarStateMachine)
//! - **`WebSocket` endpoint** (`/ws`) for live clients: every broadcast
//!   [`LiveEvent`](avatar_types::LiveEvent) is pushed to all of them via
//!   [`tokio::sync::broadcast`], and clients may send mutation commands
//!   back
//! - **Read endpoints** for the current state, liveness, and status
//! - **Minimal HTML status page** (`GET /`)
//! - **Prometheus metrics** (`GET /metrics`) with per-request durations
//!
//! The gateway does not subscribe to the state machine itself. The relay
//! binary registers a fan-out listener that calls [`AppState::broadcast`]
//! for each notification.

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::GatewayError;
pub use metrics::HttpMetrics;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
