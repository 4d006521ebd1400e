//! Job execution service
//!
//! Drives the per-tick pipeline for one test: synchronize the source,
//! prepare the runtime environment, run the test subprocess, and fold the
//! outcome into a [`JobReport`]. Stage failures never escape: they become
//! failed reports so a bad tick can never take down the dispatcher or
//! disturb other tests' schedules.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{ExecError, JobError};
use crate::service::prepare::{NoopPreparer, PrepareService, PythonVenvPreparer};
use crate::service::sync::SyncService;
use vigil_core::domain::job::{JobReport, JobStatus, RevisionRef};
use vigil_core::domain::test::{Language, TestDefinition};

/// Environment variable carrying the synchronized revision into the test
/// subprocess, so the test can self-report which commit it ran against.
pub const REVISION_ENV: &str = "VIGIL_REVISION";

/// Service trait for executing one scheduled job
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Runs one tick's job for `test` and returns its report.
    ///
    /// Total: stage failures are folded into a failed report.
    async fn execute_job(&self, test: &TestDefinition) -> JobReport;
}

/// Standard implementation of ExecutionService
pub struct StandardExecutionService {
    synchronizer: Arc<dyn SyncService>,
    workspace_root: PathBuf,
    noop: NoopPreparer,
    python: PythonVenvPreparer,
}

impl StandardExecutionService {
    pub fn new(synchronizer: Arc<dyn SyncService>, workspace_root: PathBuf) -> Self {
        Self {
            synchronizer,
            workspace_root,
            noop: NoopPreparer,
            python: PythonVenvPreparer,
        }
    }

    /// The test's namespace directory (keyed by test name)
    fn namespace_dir(&self, test: &TestDefinition) -> PathBuf {
        self.workspace_root.join(&test.name)
    }

    /// The directory the test runs from: namespace + optional subdirectory
    fn working_dir(namespace: &Path, test: &TestDefinition) -> PathBuf {
        match &test.working_dir {
            Some(sub) => namespace.join(sub),
            None => namespace.to_path_buf(),
        }
    }

    /// Selects the preparer for the test's language capability
    async fn prepare(
        &self,
        test: &TestDefinition,
        workdir: &Path,
    ) -> Result<PathBuf, crate::error::PrepareError> {
        match test.language {
            Language::Binary => self.noop.prepare(test, workdir).await,
            Language::Python => self.python.prepare(test, workdir).await,
        }
    }

    /// Spawns the test subprocess and buffers its output to completion.
    ///
    /// The configured argument string is split on whitespace and passed as
    /// discrete argv entries; no shell is involved. When a timeout is
    /// configured, expiry drops the child, which kills it via
    /// `kill_on_drop`.
    async fn run_test_process(
        test: &TestDefinition,
        executable: &Path,
        workdir: &Path,
        revision: &RevisionRef,
    ) -> Result<std::process::Output, ExecError> {
        if executable.as_os_str().is_empty() {
            return Err(ExecError::EmptyCommand);
        }

        let mut cmd = Command::new(executable);
        cmd.args(test.args.split_whitespace())
            .current_dir(workdir)
            .env(REVISION_ENV, revision.as_str())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(ExecError::Spawn)?;

        match test.timeout {
            Some(secs) if secs > 0 => {
                tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output())
                    .await
                    .map_err(|_| ExecError::Timeout { timeout_secs: secs })?
                    .map_err(ExecError::Wait)
            }
            _ => child.wait_with_output().await.map_err(ExecError::Wait),
        }
    }
}

/// Builds a failed report for a stage error, logging it with full context
#[allow(clippy::too_many_arguments)]
fn failure(
    job_id: Uuid,
    test: &TestDefinition,
    err: JobError,
    revision: Option<RevisionRef>,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    started_at: chrono::DateTime<chrono::Utc>,
    start: Instant,
) -> JobReport {
    let stage = err.stage();
    error!(
        job_id = %job_id,
        test = %test.name,
        repository = %test.source.repository,
        stage = %stage,
        error = %err,
        "Job failed"
    );

    JobReport {
        job_id,
        test_name: test.name.clone(),
        status: JobStatus::Failed,
        failed_stage: Some(stage),
        revision,
        exit_code,
        stdout,
        stderr,
        error: Some(err.to_string()),
        started_at,
        finished_at: Utc::now(),
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

#[async_trait]
impl ExecutionService for StandardExecutionService {
    async fn execute_job(&self, test: &TestDefinition) -> JobReport {
        let job_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        info!(job_id = %job_id, test = %test.name, "Starting job");

        let namespace = self.namespace_dir(test);

        // Syncing
        let outcome = match self.synchronizer.sync(&test.source, &namespace).await {
            Ok(outcome) => outcome,
            Err(e) => {
                return failure(
                    job_id,
                    test,
                    e.into(),
                    None,
                    None,
                    String::new(),
                    String::new(),
                    started_at,
                    start,
                );
            }
        };
        let revision = outcome.revision().clone();
        debug!(
            job_id = %job_id,
            test = %test.name,
            revision = %revision,
            changed = outcome.is_changed(),
            "Source synchronized"
        );

        let workdir = Self::working_dir(&namespace, test);

        // Preparing
        let executable = match self.prepare(test, &workdir).await {
            Ok(path) => path,
            Err(e) => {
                return failure(
                    job_id,
                    test,
                    e.into(),
                    Some(revision),
                    None,
                    String::new(),
                    String::new(),
                    started_at,
                    start,
                );
            }
        };

        // Executing
        let output = match Self::run_test_process(test, &executable, &workdir, &revision).await {
            Ok(output) => output,
            Err(e) => {
                return failure(
                    job_id,
                    test,
                    e.into(),
                    Some(revision),
                    None,
                    String::new(),
                    String::new(),
                    started_at,
                    start,
                );
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return failure(
                job_id,
                test,
                ExecError::NonZeroExit { exit_code }.into(),
                Some(revision),
                Some(exit_code),
                stdout,
                stderr,
                started_at,
                start,
            );
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            job_id = %job_id,
            test = %test.name,
            revision = %revision,
            exit_code,
            duration_ms,
            "Job succeeded"
        );

        JobReport {
            job_id,
            test_name: test.name.clone(),
            status: JobStatus::Succeeded,
            failed_stage: None,
            revision: Some(revision),
            exit_code: Some(exit_code),
            stdout,
            stderr,
            error: None,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        }
    }
}
