//! Job domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, stable identifier of a synchronized commit
///
/// Produced by the synchronizer on every successful sync and injected into
/// the test subprocess environment so the test can self-report which
/// revision it ran against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionRef(String);

impl RevisionRef {
    pub fn new(rev: impl Into<String>) -> Self {
        Self(rev.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RevisionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one synchronization attempt
///
/// A pull that finds no upstream changes is a normal outcome, not an error;
/// both variants carry the resulting revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The working copy advanced to a new revision
    Changed(RevisionRef),

    /// The working copy was already at the latest revision
    Unchanged(RevisionRef),
}

impl SyncOutcome {
    /// The revision the working copy is at after the sync
    pub fn revision(&self) -> &RevisionRef {
        match self {
            SyncOutcome::Changed(rev) | SyncOutcome::Unchanged(rev) => rev,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, SyncOutcome::Changed(_))
    }
}

/// Pipeline stage a job can fail at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStage {
    Sync,
    Prepare,
    Execute,
    Report,
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStage::Sync => write!(f, "sync"),
            JobStage::Prepare => write!(f, "prepare"),
            JobStage::Execute => write!(f, "execute"),
            JobStage::Report => write!(f, "report"),
        }
    }
}

/// Job execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Succeeded,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one scheduled execution attempt
///
/// Created per tick, handed to the reporter, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub test_name: String,
    pub status: JobStatus,

    /// Stage the job failed at, if it failed
    pub failed_stage: Option<JobStage>,

    /// Revision the job ran against; `None` when synchronization failed
    pub revision: Option<RevisionRef>,

    /// Exit code of the test subprocess, if one was spawned
    pub exit_code: Option<i32>,

    /// Captured stdout
    pub stdout: String,

    /// Captured stderr
    pub stderr: String,

    /// Failure description, if any
    pub error: Option<String>,

    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub duration_ms: u64,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}
