//! Runner configuration
//!
//! Bootstraps the runner from environment variables, fetches the YAML
//! configuration document (from its own git repository, synchronized like
//! any test source, or from a local file override), substitutes credential
//! environment variables, and validates the result. The core only ever
//! sees resolved literal credentials.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::info;

use crate::service::SyncService;
use vigil_core::domain::sink::{SinkKind, SinkSpec};
use vigil_core::domain::test::{Language, SourceSpec, TestDefinition};

/// Namespace the configuration repository is synchronized into
pub const CONFIG_NAMESPACE: &str = "runner-config";

/// Environment bootstrap settings
///
/// Expected environment variables:
/// - VIGIL_CONFIG_REPO (required unless VIGIL_CONFIG_FILE is set)
/// - VIGIL_CONFIG_BRANCH (optional, default: main)
/// - VIGIL_CONFIG_PATH (optional, default: vigil.yaml)
/// - VIGIL_GIT_USER / VIGIL_GIT_TOKEN (required with VIGIL_CONFIG_REPO)
/// - VIGIL_CONFIG_FILE (optional local-file override)
/// - VIGIL_WORKSPACE (optional, default: <temp dir>/vigil)
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub config_repo: Option<String>,
    pub config_branch: String,
    pub config_path: String,
    pub git_username: Option<String>,
    pub git_token: Option<String>,
    pub config_file: Option<PathBuf>,
    pub workspace_root: PathBuf,
}

impl Bootstrap {
    /// Reads and validates bootstrap settings from the environment
    pub fn from_env() -> Result<Self> {
        let bootstrap = Self {
            config_repo: std::env::var("VIGIL_CONFIG_REPO").ok(),
            config_branch: std::env::var("VIGIL_CONFIG_BRANCH")
                .unwrap_or_else(|_| "main".to_string()),
            config_path: std::env::var("VIGIL_CONFIG_PATH")
                .unwrap_or_else(|_| "vigil.yaml".to_string()),
            git_username: std::env::var("VIGIL_GIT_USER").ok(),
            git_token: std::env::var("VIGIL_GIT_TOKEN").ok(),
            config_file: std::env::var("VIGIL_CONFIG_FILE").ok().map(PathBuf::from),
            workspace_root: std::env::var("VIGIL_WORKSPACE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join("vigil")),
        };
        bootstrap.validate()?;
        Ok(bootstrap)
    }

    /// Validates that a configuration origin is fully specified
    pub fn validate(&self) -> Result<()> {
        if self.config_file.is_some() {
            return Ok(());
        }

        if self.config_repo.as_deref().unwrap_or("").is_empty() {
            bail!("VIGIL_CONFIG_REPO environment variable is required");
        }
        if self.git_username.as_deref().unwrap_or("").is_empty() {
            bail!("VIGIL_GIT_USER environment variable is required");
        }
        if self.git_token.as_deref().unwrap_or("").is_empty() {
            bail!("VIGIL_GIT_TOKEN environment variable is required");
        }

        Ok(())
    }

    /// The source spec of the configuration repository
    fn config_source(&self) -> Result<SourceSpec> {
        let repository = self
            .config_repo
            .clone()
            .context("VIGIL_CONFIG_REPO is not set")?;
        Ok(SourceSpec {
            repository,
            branch: self.config_branch.clone(),
            username: self.git_username.clone().unwrap_or_default(),
            token: self.git_token.clone().unwrap_or_default(),
        })
    }
}

/// Runner identity from the configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Fully resolved and validated runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub runner: RunnerInfo,
    pub tests: Vec<TestDefinition>,
    pub sinks: Vec<SinkSpec>,
    pub workspace_root: PathBuf,
}

// Raw document types as they appear on disk. Credential fields name
// environment variables, not values; resolution happens below.

#[derive(Debug, Deserialize)]
struct RawConfig {
    runner: RunnerInfo,
    #[serde(default)]
    tests: Vec<RawTest>,
    #[serde(default)]
    sinks: Vec<SinkSpec>,
}

#[derive(Debug, Deserialize)]
struct RawTest {
    name: String,
    source: RawSource,
    #[serde(default)]
    language: Language,
    working_dir: Option<String>,
    setup_cmd: Option<String>,
    executable: String,
    #[serde(default)]
    args: String,
    frequency: u32,
    timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    repository: String,
    #[serde(default = "default_branch")]
    branch: String,
    username_env: String,
    token_env: String,
}

fn default_branch() -> String {
    "main".to_string()
}

/// Parses the YAML configuration document
fn parse_document(text: &str) -> Result<RawConfig> {
    serde_yaml::from_str(text).context("Failed to parse configuration document")
}

/// Resolves credential references and validates every definition.
///
/// `lookup` abstracts the environment so resolution is testable without
/// mutating process state.
fn resolve_with(
    raw: RawConfig,
    workspace_root: PathBuf,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<RunnerConfig> {
    let mut seen = HashSet::new();
    let mut tests = Vec::with_capacity(raw.tests.len());

    for test in raw.tests {
        if test.name.trim().is_empty() {
            bail!("test name cannot be empty");
        }
        if !seen.insert(test.name.clone()) {
            bail!("duplicate test name: {}", test.name);
        }
        if test.frequency == 0 {
            bail!("test {}: frequency must be greater than 0", test.name);
        }
        if test.executable.trim().is_empty() {
            bail!("test {}: executable cannot be empty", test.name);
        }
        if test.source.repository.trim().is_empty() {
            bail!("test {}: source repository cannot be empty", test.name);
        }
        if test.source.branch.trim().is_empty() {
            bail!("test {}: source branch cannot be empty", test.name);
        }

        let username = lookup(&test.source.username_env)
            .filter(|v| !v.is_empty())
            .with_context(|| {
                format!(
                    "test {}: credential variable {} is not set",
                    test.name, test.source.username_env
                )
            })?;
        let token = lookup(&test.source.token_env)
            .filter(|v| !v.is_empty())
            .with_context(|| {
                format!(
                    "test {}: credential variable {} is not set",
                    test.name, test.source.token_env
                )
            })?;

        tests.push(TestDefinition {
            name: test.name,
            source: SourceSpec {
                repository: test.source.repository,
                branch: test.source.branch,
                username,
                token,
            },
            language: test.language,
            working_dir: test.working_dir.filter(|d| !d.trim().is_empty()),
            setup_cmd: test.setup_cmd.filter(|c| !c.trim().is_empty()),
            executable: test.executable,
            args: test.args,
            frequency: test.frequency,
            timeout: test.timeout,
        });
    }

    for sink in &raw.sinks {
        if sink.kind == SinkKind::Webhook && sink.url.as_deref().unwrap_or("").is_empty() {
            bail!("webhook sink requires a url");
        }
    }

    Ok(RunnerConfig {
        runner: raw.runner,
        tests,
        sinks: raw.sinks,
        workspace_root,
    })
}

/// Loads the runner configuration.
///
/// With a local-file override the document is read directly; otherwise the
/// configuration repository is synchronized into its own namespace first,
/// using the same synchronizer the tests use.
pub async fn load(bootstrap: &Bootstrap, synchronizer: &dyn SyncService) -> Result<RunnerConfig> {
    let text = match &bootstrap.config_file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?,
        None => {
            let source = bootstrap.config_source()?;
            let namespace = bootstrap.workspace_root.join(CONFIG_NAMESPACE);
            let outcome = synchronizer
                .sync(&source, &namespace)
                .await
                .context("Failed to synchronize configuration repository")?;
            info!(
                revision = %outcome.revision(),
                "Configuration repository synchronized"
            );

            let path = namespace.join(&bootstrap.config_path);
            tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read configuration at {}", path.display()))?
        }
    };

    let raw = parse_document(&text)?;
    resolve_with(raw, bootstrap.workspace_root.clone(), |name| {
        std::env::var(name).ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
runner:
  name: edge-1
  version: "0.3"
tests:
  - name: demo
    source:
      repository: https://example.test/repo.git
      branch: main
      username_env: DEMO_GIT_USER
      token_env: DEMO_GIT_TOKEN
    language: python
    working_dir: checks
    setup_cmd: ""
    executable: pytest
    args: "-q smoke_test.py"
    frequency: 300
    timeout: 600
sinks:
  - kind: stdout
    format: text
"#;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resolve(
        text: &str,
        vars: HashMap<String, String>,
    ) -> Result<RunnerConfig> {
        let raw = parse_document(text)?;
        resolve_with(raw, PathBuf::from("/tmp/vigil"), |name| {
            vars.get(name).cloned()
        })
    }

    #[test]
    fn test_parse_and_resolve_sample() {
        let config = resolve(
            SAMPLE,
            env(&[("DEMO_GIT_USER", "alice"), ("DEMO_GIT_TOKEN", "t0k3n")]),
        )
        .unwrap();

        assert_eq!(config.runner.name, "edge-1");
        assert_eq!(config.tests.len(), 1);
        assert_eq!(config.sinks.len(), 1);

        let test = &config.tests[0];
        assert_eq!(test.name, "demo");
        assert_eq!(test.language, Language::Python);
        assert_eq!(test.source.username, "alice");
        assert_eq!(test.source.token, "t0k3n");
        assert_eq!(test.working_dir.as_deref(), Some("checks"));
        // Empty setup commands are dropped during resolution.
        assert!(test.setup_cmd.is_none());
        assert_eq!(test.frequency, 300);
        assert_eq!(test.timeout, Some(600));
    }

    #[test]
    fn test_missing_credential_variable_is_fatal() {
        let err = resolve(SAMPLE, env(&[("DEMO_GIT_USER", "alice")])).unwrap_err();
        assert!(err.to_string().contains("DEMO_GIT_TOKEN"));
    }

    #[test]
    fn test_zero_frequency_is_rejected() {
        let doc = SAMPLE.replace("frequency: 300", "frequency: 0");
        let err = resolve(
            &doc,
            env(&[("DEMO_GIT_USER", "alice"), ("DEMO_GIT_TOKEN", "t0k3n")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("frequency"));
    }

    #[test]
    fn test_duplicate_test_names_are_rejected() {
        // Duplicate the test entry inside the tests list.
        let entry = &SAMPLE[SAMPLE.find("  - name: demo").unwrap()..SAMPLE.find("sinks:").unwrap()];
        let doc = SAMPLE.replace("sinks:", &format!("{entry}sinks:"));
        let err = resolve(
            &doc,
            env(&[("DEMO_GIT_USER", "alice"), ("DEMO_GIT_TOKEN", "t0k3n")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_webhook_sink_without_url_is_rejected() {
        let doc = SAMPLE.replace("kind: stdout", "kind: webhook");
        let err = resolve(
            &doc,
            env(&[("DEMO_GIT_USER", "alice"), ("DEMO_GIT_TOKEN", "t0k3n")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("webhook"));
    }

    #[test]
    fn test_branch_defaults_to_main() {
        let doc = SAMPLE.replace("      branch: main\n", "");
        let config = resolve(
            &doc,
            env(&[("DEMO_GIT_USER", "alice"), ("DEMO_GIT_TOKEN", "t0k3n")]),
        )
        .unwrap();
        assert_eq!(config.tests[0].source.branch, "main");
    }

    #[test]
    fn test_bootstrap_validation() {
        let mut bootstrap = Bootstrap {
            config_repo: Some("https://example.test/config.git".to_string()),
            config_branch: "main".to_string(),
            config_path: "vigil.yaml".to_string(),
            git_username: Some("alice".to_string()),
            git_token: Some("t0k3n".to_string()),
            config_file: None,
            workspace_root: PathBuf::from("/tmp/vigil"),
        };
        assert!(bootstrap.validate().is_ok());

        bootstrap.git_token = None;
        assert!(bootstrap.validate().is_err());

        // A local-file override needs no repository or credentials.
        bootstrap.config_repo = None;
        bootstrap.config_file = Some(PathBuf::from("/etc/vigil.yaml"));
        assert!(bootstrap.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_local_file_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.yaml");
        std::fs::write(
            &path,
            "runner:\n  name: local\ntests: []\nsinks:\n  - kind: stdout\n",
        )
        .unwrap();

        let bootstrap = Bootstrap {
            config_repo: None,
            config_branch: "main".to_string(),
            config_path: "vigil.yaml".to_string(),
            git_username: None,
            git_token: None,
            config_file: Some(path),
            workspace_root: dir.path().to_path_buf(),
        };

        let config = crate::config::load(&bootstrap, &crate::service::GitSynchronizer::new())
            .await
            .unwrap();
        assert_eq!(config.runner.name, "local");
        assert!(config.tests.is_empty());
        assert_eq!(config.sinks.len(), 1);
    }
}
