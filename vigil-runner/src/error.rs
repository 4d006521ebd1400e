//! Error types for the Vigil runner
//!
//! Every error here is scoped to a single job attempt (or a single sink
//! delivery) and is non-fatal to the process: it is caught at its stage
//! boundary, logged, and ends that tick's job only.

use thiserror::Error;
use vigil_core::domain::job::JobStage;

/// Errors from repository synchronization
#[derive(Debug, Error)]
pub enum SyncError {
    /// The git binary could not be invoked
    #[error("failed to run git {op}: {source}")]
    Spawn {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A git operation exited non-zero
    #[error("git {op} failed: {stderr}")]
    Git { op: &'static str, stderr: String },

    /// The repository reported an empty HEAD revision
    #[error("repository returned an empty HEAD revision")]
    EmptyRevision,

    /// Filesystem error while managing the namespace
    #[error("namespace I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from environment preparation
#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("environment I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Virtual environment creation failed
    #[error("failed to create virtual environment: {stderr}")]
    VenvCreate { stderr: String },

    /// Dependency manifest installation failed
    #[error("failed to install dependencies: {stderr}")]
    DependencyInstall { stderr: String },

    /// The configured setup command exited non-zero
    #[error("setup command exited with code {exit_code}: {stderr}")]
    Setup { exit_code: i32, stderr: String },
}

/// Errors from subprocess execution
#[derive(Debug, Error)]
pub enum ExecError {
    /// The configured command line is empty
    #[error("test command is empty")]
    EmptyCommand,

    /// The test process could not be spawned
    #[error("failed to spawn test process: {0}")]
    Spawn(#[source] std::io::Error),

    /// Waiting on the test process failed
    #[error("failed to wait on test process: {0}")]
    Wait(#[source] std::io::Error),

    /// The test process exited non-zero
    #[error("test exited with code {exit_code}")]
    NonZeroExit { exit_code: i32 },

    /// The test process exceeded its configured deadline and was killed
    #[error("test timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Errors delivering a report to a single sink
///
/// Scoped per sink: a failure here never aborts delivery to other sinks.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook returned HTTP {0}")]
    HttpStatus(u16),

    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),

    /// A webhook sink was configured without a destination URL
    #[error("sink is missing a destination URL")]
    MissingUrl,
}

/// A job-stage failure, tagged with the stage it occurred at
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Prepare(#[from] PrepareError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl JobError {
    /// The pipeline stage this error occurred at
    pub fn stage(&self) -> JobStage {
        match self {
            JobError::Sync(_) => JobStage::Sync,
            JobError::Prepare(_) => JobStage::Prepare,
            JobError::Exec(_) => JobStage::Execute,
        }
    }
}
