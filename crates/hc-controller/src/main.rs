//! healthwatch controller daemon
//!
//! Wires the in-memory cluster backend, the event recorder, and the
//! controller together, then runs until interrupted. Credential loading
//! and a real cluster transport would slot in behind the store traits.

use clap::Parser;
use hc_controller::{Controller, ControllerConfig, ControllerError, ControllerResult, InMemoryCluster, Recorder};
use hc_types::EventSeverity;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// healthwatch controller CLI
#[derive(Parser)]
#[command(name = "hcd")]
#[command(about = "Keeps CronJobs in sync with HealthCheck resources", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "HC_CONFIG")]
    config: Option<String>,

    /// Number of reconcile workers
    #[arg(short, long, env = "HC_WORKERS")]
    workers: Option<usize>,

    /// Log level
    #[arg(long, env = "HC_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "HC_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> ControllerResult<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = ControllerConfig::load(cli.config.as_deref())
        .map_err(|e| ControllerError::Config(e.to_string()))?;
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        workers = config.workers,
        "starting healthwatch controller"
    );

    let cluster = Arc::new(InMemoryCluster::new());
    let recorder = Recorder::default();

    // Mirror recorded events into the log.
    let mut events = recorder.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event.severity {
                EventSeverity::Normal => {
                    tracing::info!(subject = %event.subject, reason = %event.reason, "{}", event.message);
                }
                EventSeverity::Warning => {
                    tracing::warn!(subject = %event.subject, reason = %event.reason, "{}", event.message);
                }
            }
        }
    });

    let controller = Arc::new(Controller::new(cluster, recorder, config));
    controller.run(shutdown_signal()).await
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
