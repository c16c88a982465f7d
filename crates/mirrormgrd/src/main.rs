//! mirrormgrd - OVS Port-Mirror Reconciliation Daemon
//!
//! Entry point: loads the mirror policy, performs the startup rebuild of
//! every configured bridge, then serves port-state events until shutdown.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use mirror_common::ShellChannel;
use mirrormgrd::{EventDispatcher, MirrorConfig, MirrorMgr, PortStateEvent};

/// Default configuration file location.
const DEFAULT_CONFIG_PATH: &str = "/etc/mirrormgr/mirrormgrd.conf";

/// Depth of the port-state event queue.
const EVENT_QUEUE_DEPTH: usize = 64;

/// Initializes tracing/logging subsystem
fn init_logging() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(true)
        .init();
}

/// Configuration path from `MIRRORMGRD_CONFIG`, the first argument, or the
/// default location.
fn config_path() -> String {
    std::env::var("MIRRORMGRD_CONFIG")
        .ok()
        .or_else(|| std::env::args().nth(1))
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    info!("--- Starting mirrormgrd ---");

    let path = config_path();
    let config = match MirrorConfig::load(&path) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            // Configuration invariant violations are unrecoverable.
            error!(path = %path, error = %e, "Configuration rejected");
            return ExitCode::FAILURE;
        }
    };
    info!(path = %path, bridges = config.bridges.len(), "Configuration loaded");

    let channel = Arc::new(ShellChannel::new(config.channel.command_timeout()));
    let mgr = Arc::new(MirrorMgr::new(config, channel));

    // Startup pass: every bridge gets its session rebuilt once. A failing
    // bridge keeps its previous state and is retried on its next event.
    if let Err(e) = mgr.start().await {
        error!(error = %e, "Startup rebuild incomplete");
    }

    let (tx, rx) = mpsc::channel::<PortStateEvent>(EVENT_QUEUE_DEPTH);

    // The OpenFlow control-channel client is an external collaborator that
    // feeds port-state events into `tx`.
    // TODO: wire the controller subscription to `tx` once the control-channel
    // client lands.

    let dispatcher = Arc::new(EventDispatcher::new(mgr));
    let run = tokio::spawn(dispatcher.run(rx));

    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!(error = %e, "Signal handler failed"),
    }

    // Closing the sender lets the dispatcher drain in-flight work and exit.
    drop(tx);
    if let Err(e) = run.await {
        error!(error = %e, "Dispatcher task failed");
        return ExitCode::FAILURE;
    }

    info!("mirrormgrd exiting");
    ExitCode::SUCCESS
}
