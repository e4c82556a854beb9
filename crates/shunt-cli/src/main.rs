//! shunt daemon entrypoint.
//!
//! Wires the production collaborators together, drives a small demo load,
//! and shuts down on SIGINT/SIGTERM. A second signal cuts the drain delay
//! short. The final accounting report is printed to stdout.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shunt_core::daemon::{Daemon, DaemonConfig};
use shunt_core::error::AdmissionError;
use shunt_core::ports::{InMemoryStore, Recorder, SimulatedCapability};
use shunt_core::shutdown::ShutdownConfig;

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn config_from_env() -> DaemonConfig {
    let defaults = DaemonConfig::default();
    DaemonConfig {
        workers: env_usize("SHUNT_WORKERS", defaults.workers),
        queue_capacity: env_usize("SHUNT_QUEUE_CAPACITY", defaults.queue_capacity),
        task_deadline: env_secs("SHUNT_TASK_DEADLINE_SECS", defaults.task_deadline),
        shutdown: ShutdownConfig {
            drain_delay: env_secs("SHUNT_DRAIN_DELAY_SECS", defaults.shutdown.drain_delay),
            join_bound: env_secs("SHUNT_JOIN_BOUND_SECS", defaults.shutdown.join_bound),
        },
    }
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM, falling back to ctrl-c only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Submit a task at a fixed interval until admission starts refusing because
/// of shutdown. Stands in for the HTTP clients of a real deployment.
fn demo_producer(daemon: &Daemon, interval: Duration) -> tokio::task::JoinHandle<()> {
    let gateway = daemon.gateway();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match gateway.submit().await {
                Ok(id) => info!(task_id = %id, "submitted"),
                Err(AdmissionError::QueueFull) => warn!("queue full, backing off"),
                Err(AdmissionError::ShuttingDown) => break,
            }
        }
    })
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config_from_env();
    let recorder = Arc::new(Recorder::new());
    let store = Arc::new(InMemoryStore::new());
    let daemon = Daemon::start(config, Arc::new(SimulatedCapability), store, recorder);

    let producer = demo_producer(&daemon, Duration::from_millis(200));

    wait_for_signal().await;
    info!("signal received, starting shutdown");

    // A second signal skips the remaining drain delay.
    let (abort_tx, abort_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("second signal received, cutting drain delay short");
        let _ = abort_tx.send(true);
    });

    let report = daemon.shutdown_with_abort(abort_rx).await;
    let _ = producer.await;

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(err) => warn!(error = %err, "failed to render shutdown report"),
    }
}
