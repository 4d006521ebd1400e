//! Vigil Runner
//!
//! A single-process daemon that runs a fleet of independently scheduled
//! checks, each with its own git source, runtime environment, execution
//! command, and schedule.
//!
//! Architecture:
//! - Configuration: bootstrap from environment, document from a git
//!   repository (or a local file override)
//! - Services: business logic (synchronization, environment preparation,
//!   job execution, result reporting)
//! - Scheduler: one independent periodic trigger per test
//!
//! Per tick the runner re-synchronizes a test's source, prepares its
//! runtime environment, executes the configured command with the synced
//! revision injected into its environment, and forwards the captured
//! output to the configured sinks.

mod config;
mod error;
mod scheduler;
mod service;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Bootstrap;
use crate::scheduler::Dispatcher;
use crate::service::{
    ExecutionService, GitSynchronizer, Reporter, StandardExecutionService, SyncService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigil_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Vigil runner");

    let bootstrap = Bootstrap::from_env().context("Failed to read bootstrap environment")?;
    let synchronizer: Arc<dyn SyncService> = Arc::new(GitSynchronizer::new());

    let config = config::load(&bootstrap, synchronizer.as_ref())
        .await
        .context("Failed to load configuration")?;

    info!(
        runner = %config.runner.name,
        version = %config.runner.version,
        tests = config.tests.len(),
        sinks = config.sinks.len(),
        workspace = %config.workspace_root.display(),
        "Configuration loaded"
    );

    let reporter =
        Arc::new(Reporter::from_specs(&config.sinks).context("Failed to build reporting sinks")?);
    let executor: Arc<dyn ExecutionService> = Arc::new(StandardExecutionService::new(
        Arc::clone(&synchronizer),
        config.workspace_root.clone(),
    ));

    // Graceful shutdown: stop issuing ticks, let in-flight jobs finish.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, letting in-flight jobs finish");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => error!("Failed to listen for shutdown signal: {e}"),
        }
    });

    let dispatcher = Dispatcher::new(executor, reporter, shutdown_rx);
    dispatcher.run(config.tests).await?;

    info!("All triggers stopped, exiting");
    Ok(())
}
