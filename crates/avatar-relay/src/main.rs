//! Avatar state relay binary.
//!
//! Wires the state machine to its ingress paths and transports. It loads
//! configuration, starts the optional NATS bus, registers the logging
//! observer and the fan-out listeners, and serves the control API until
//! Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `avatar-relay.yaml` plus environment
//! 2. Initialize structured logging (tracing)
//! 3. Create the state machine on the current runtime
//! 4. Register the logging observer
//! 5. Connect to NATS (when `NATS_URL` is set) and start the publisher
//! 6. Register the fan-out listeners
//! 7. Subscribe to the ingress subjects
//! 8. Serve HTTP and live connections until Ctrl-C
//! 9. Cancel any pending reset and exit

mod bus;
mod error;
mod fanout;
mod observer;

use std::sync::Arc;

use avatar_core::{AvatarStateMachine, RelayConfig};
use avatar_gateway::{AppState, ServerConfig};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::bus::NatsBus;
use crate::error::RelayError;
use crate::fanout::Republisher;

/// Application entry point for the relay.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the bus cannot be
/// reached, or the server fails to bind.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet; errors go to stderr
    //    through the returned error.
    let config = RelayConfig::load().map_err(RelayError::from)?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("avatar-relay starting");
    info!(
        address = config.server.address,
        port = config.server.port,
        bus = config.bus.url.as_deref().unwrap_or("disabled"),
        activity_timeout_secs = config.avatar.activity_timeout_secs,
        "Configuration loaded"
    );

    run(&config).await?;

    info!("avatar-relay stopped");
    Ok(())
}

/// Run the relay until shutdown.
async fn run(config: &RelayConfig) -> Result<(), RelayError> {
    // 3. State machine.
    let machine = AvatarStateMachine::new(config.avatar.activity_timeout())?;
    let state = Arc::new(AppState::new(machine.clone())?);

    // 4. Logging observer, registered first so it logs before fan-out.
    observer::register(&machine);

    // 5. Bus connection and republish queue.
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();
    let mut republisher = None;
    let nats = match config.bus.url.as_deref() {
        Some(url) => Some(NatsBus::connect(url).await?),
        None => None,
    };
    if nats.is_none() {
        info!("NATS_URL not set, running without a bus");
    }
    if let Some(nats) = nats.as_ref().filter(|_| config.bus.republish) {
        let (tx, rx) = mpsc::unbounded_channel();
        tasks.push(tokio::spawn(bus::run_publisher(nats.client(), rx)));
        republisher = Some(Republisher::new(&config.bus, tx));
        info!("Republishing committed state on the bus");
    }

    // 6. Fan-out. Registered before ingress so the first bus message
    //    already reaches live clients.
    let listeners = fanout::register(&machine, &state, republisher.as_ref());
    info!(listeners = listeners.len(), "Fan-out listeners registered");

    // 7. Ingress.
    if let Some(nats) = &nats {
        let messages = nats.subscribe_ingress(&config.bus).await?;
        tasks.push(tokio::spawn(bus::run_ingress(
            messages,
            config.bus.clone(),
            machine.clone(),
            Arc::clone(&state),
        )));
    }

    // 8. Serve.
    let server_config = ServerConfig::from(&config.server);
    let served = avatar_gateway::start_server(&server_config, state, shutdown_signal()).await;

    // 9. Teardown runs even when serving failed.
    machine.shutdown();
    for task in tasks {
        task.abort();
    }

    served?;
    Ok(())
}

/// Resolve on Ctrl-C. If the signal handler cannot be installed the
/// relay keeps running.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
