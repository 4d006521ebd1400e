//! Test definition domain types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One configured recurring check
///
/// Loaded once at bootstrap and immutable for the process lifetime.
/// The name doubles as the on-disk namespace key for the test's
/// local working copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDefinition {
    /// Unique test name, also the namespace directory name
    pub name: String,

    /// Where the test's source lives and how to authenticate
    pub source: SourceSpec,

    /// Runtime capability required to execute the test
    pub language: Language,

    /// Optional subdirectory inside the namespace to run from
    pub working_dir: Option<String>,

    /// Optional shell setup step run during environment preparation
    pub setup_cmd: Option<String>,

    /// Executable to invoke (possibly rewritten by the preparer)
    pub executable: String,

    /// Whitespace-separated command-line arguments
    pub args: String,

    /// Scheduling period in seconds (> 0)
    pub frequency: u32,

    /// Optional execution deadline in seconds; `None` means unbounded
    pub timeout: Option<u64>,
}

impl TestDefinition {
    /// The scheduling period as a Duration
    pub fn period(&self) -> Duration {
        Duration::from_secs(u64::from(self.frequency))
    }
}

/// Source location and resolved credentials for a test
///
/// Credentials arrive here already resolved to literal values; the
/// environment-variable indirection in the configuration document is a
/// bootstrap concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Repository URL
    pub repository: String,

    /// Branch to track
    pub branch: String,

    /// Username for remote access
    pub username: String,

    /// Token or password for remote access
    pub token: String,
}

/// Runtime capability of a test
///
/// `Binary` is the no-op capability: the configured executable is used as-is.
/// `Python` requires an isolated dependency environment (venv + pip) built
/// inside the namespace before execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Binary,
    Python,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_from_frequency() {
        let def = TestDefinition {
            name: "demo".to_string(),
            source: SourceSpec {
                repository: "https://example.test/repo.git".to_string(),
                branch: "main".to_string(),
                username: "user".to_string(),
                token: "token".to_string(),
            },
            language: Language::Binary,
            working_dir: None,
            setup_cmd: None,
            executable: "true".to_string(),
            args: String::new(),
            frequency: 5,
            timeout: None,
        };
        assert_eq!(def.period(), Duration::from_secs(5));
    }

    #[test]
    fn test_language_deserializes_lowercase() {
        let lang: Language = serde_json::from_str("\"python\"").unwrap();
        assert_eq!(lang, Language::Python);
        let lang: Language = serde_json::from_str("\"binary\"").unwrap();
        assert_eq!(lang, Language::Binary);
    }
}
