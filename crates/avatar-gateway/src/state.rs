//! Shared application state for the control API server.
//!
//! [`AppState`] holds the state machine handle, the broadcast channel
//! that feeds every live connection, and the request metrics.

use avatar_core::AvatarStateMachine;
use avatar_types::LiveEvent;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::error::GatewayError;
use crate::metrics::HttpMetrics;

/// Capacity of the live-event broadcast channel.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The avatar state machine. Every ingress path mutates through it.
    pub machine: AvatarStateMachine,
    /// Broadcast sender for live-connection events.
    pub tx: broadcast::Sender<LiveEvent>,
    /// Wall-clock time the server state was created.
    pub started_at: DateTime<Utc>,
    /// Request metrics served on `/metrics`.
    pub metrics: HttpMetrics,
}

impl AppState {
    /// Create application state around `machine`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Metrics`] if the metrics registry cannot be
    /// built.
    pub fn new(machine: AvatarStateMachine) -> Result<Self, GatewayError> {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Ok(Self {
            machine,
            tx,
            started_at: Utc::now(),
            metrics: HttpMetrics::new()?,
        })
    }

    /// Subscribe to the live-event channel.
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }

    /// Push an event to every connected live client.
    ///
    /// Returns the number of receivers that got the event. Returns 0 if
    /// no clients are connected (this is not an error).
    pub fn broadcast(&self, event: LiveEvent) -> usize {
        // send returns Err only when there are zero receivers.
        self.tx.send(event).unwrap_or(0)
    }

    /// Number of currently connected live clients.
    pub fn live_clients(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Whole seconds since the state was created.
    pub fn uptime_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // `num_seconds` can be negative if clocks are weird; treat as 0.
        u64::try_from(elapsed.max(0)).unwrap_or(0)
    }
}
