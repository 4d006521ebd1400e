//! Trigger dispatcher
//!
//! Owns one recurring trigger task per test definition. Each trigger fires
//! every `frequency` seconds, starting one full period after registration,
//! and runs its job inline in its own task: jobs for the same test are
//! serialized (a tick that would overlap a still-running job is delayed,
//! not dropped and never run concurrently), while different tests never
//! wait on each other.
//!
//! Shutdown is graceful: once the shutdown signal flips, triggers stop
//! issuing ticks and in-flight jobs run to completion before the
//! dispatcher returns.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::service::{ExecutionService, Reporter};
use vigil_core::domain::test::TestDefinition;

/// Dispatcher that schedules and runs all configured tests
pub struct Dispatcher {
    executor: Arc<dyn ExecutionService>,
    reporter: Arc<Reporter>,
    shutdown: watch::Receiver<bool>,
}

impl Dispatcher {
    pub fn new(
        executor: Arc<dyn ExecutionService>,
        reporter: Arc<Reporter>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            executor,
            reporter,
            shutdown,
        }
    }

    /// Registers one trigger per test and runs until shutdown
    pub async fn run(&self, tests: Vec<TestDefinition>) -> Result<()> {
        let mut handles = Vec::with_capacity(tests.len());

        for test in tests {
            info!(
                test = %test.name,
                frequency_secs = test.frequency,
                "Scheduled test"
            );
            handles.push(self.spawn_trigger_task(test));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Trigger task panicked: {e}");
            }
        }

        Ok(())
    }

    /// Spawns the trigger task for a single test
    fn spawn_trigger_task(&self, test: TestDefinition) -> tokio::task::JoinHandle<()> {
        let executor = Arc::clone(&self.executor);
        let reporter = Arc::clone(&self.reporter);
        let mut shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let period = test.period();
            // First fire one period after registration, then fixed-period.
            let mut interval = time::interval_at(Instant::now() + period, period);
            // A tick that lands while the previous job is still running is
            // delayed until that job finishes, keeping the namespace
            // single-writer.
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        Self::run_tick(&test, executor.as_ref(), &reporter).await;
                    }
                    _ = shutdown.changed() => {
                        info!(test = %test.name, "Shutdown requested, stopping trigger");
                        break;
                    }
                }
            }
        })
    }

    /// Runs one tick's job and delivers its report on success
    async fn run_tick(test: &TestDefinition, executor: &dyn ExecutionService, reporter: &Reporter) {
        let report = executor.execute_job(test).await;

        if report.succeeded() {
            reporter.report(&report).await;
        } else {
            // The executor already logged the failure with full context;
            // failed jobs never reach sinks.
            warn!(
                test = %test.name,
                stage = ?report.failed_stage,
                "Job failed, skipping sink delivery"
            );
        }
    }
}
