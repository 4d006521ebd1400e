//! Environment preparation service
//!
//! Polymorphic over the test's language capability. The binary variant is a
//! passthrough; the python variant maintains an isolated venv inside the
//! test's working directory and rewrites the effective executable to point
//! into it. Both variants run the optional setup command first.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::PrepareError;
use vigil_core::domain::test::TestDefinition;

/// Service trait for preparing a test's runtime environment
///
/// Returns the effective executable path the executor should spawn, which
/// may differ from the configured one when the environment provides its own
/// interpreter or binaries.
#[async_trait]
pub trait PrepareService: Send + Sync {
    async fn prepare(
        &self,
        test: &TestDefinition,
        workdir: &Path,
    ) -> Result<PathBuf, PrepareError>;
}

/// Runs the configured setup command, if any, in the working directory.
///
/// Setup commands are shell fragments, so this is the one place a shell is
/// involved; the test command itself is spawned directly.
async fn run_setup_cmd(test: &TestDefinition, workdir: &Path) -> Result<(), PrepareError> {
    let Some(cmd) = &test.setup_cmd else {
        return Ok(());
    };

    debug!(test = %test.name, setup_cmd = %cmd, "Running setup command");

    let output = Command::new("sh")
        .args(["-c", cmd])
        .current_dir(workdir)
        .output()
        .await?;

    if !output.status.success() {
        return Err(PrepareError::Setup {
            exit_code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(())
}

/// Preparer for tests that run the configured executable as-is
pub struct NoopPreparer;

#[async_trait]
impl PrepareService for NoopPreparer {
    async fn prepare(
        &self,
        test: &TestDefinition,
        workdir: &Path,
    ) -> Result<PathBuf, PrepareError> {
        run_setup_cmd(test, workdir).await?;
        Ok(PathBuf::from(&test.executable))
    }
}

/// Preparer for python tests: venv + dependency manifest
///
/// The venv lives at `<workdir>/venv` and is created once, then reused
/// across ticks. `requirements.txt` is (re)installed on every tick when
/// present, so dependency updates land without recreating the venv.
pub struct PythonVenvPreparer;

#[async_trait]
impl PrepareService for PythonVenvPreparer {
    async fn prepare(
        &self,
        test: &TestDefinition,
        workdir: &Path,
    ) -> Result<PathBuf, PrepareError> {
        run_setup_cmd(test, workdir).await?;

        let venv_dir = workdir.join("venv");
        let created = !venv_dir.is_dir();

        if created {
            let output = Command::new("python3")
                .args(["-m", "venv"])
                .arg(&venv_dir)
                .output()
                .await?;

            if !output.status.success() {
                // Remove the partial venv so the next tick starts clean.
                let _ = tokio::fs::remove_dir_all(&venv_dir).await;
                return Err(PrepareError::VenvCreate {
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }

            info!(test = %test.name, venv = %venv_dir.display(), "Created virtual environment");
        }

        let manifest = workdir.join("requirements.txt");
        if manifest.is_file() {
            let pip = venv_dir.join("bin").join("pip");
            let output = Command::new(&pip)
                .arg("install")
                .arg("-r")
                .arg(&manifest)
                .output()
                .await?;

            if !output.status.success() {
                if created {
                    let _ = tokio::fs::remove_dir_all(&venv_dir).await;
                }
                return Err(PrepareError::DependencyInstall {
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }

            debug!(test = %test.name, manifest = %manifest.display(), "Installed dependencies");
        }

        Ok(venv_dir.join("bin").join(&test.executable))
    }
}
