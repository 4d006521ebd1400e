//! Reporting sink domain types

use serde::{Deserialize, Serialize};

/// Specification of one reporting sink
///
/// Read-only, loaded once at bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSpec {
    /// Sink variant
    pub kind: SinkKind,

    /// Output format hint; defaults to plain text when absent
    pub format: Option<OutputFormat>,

    /// Destination URL (webhook sinks only)
    pub url: Option<String>,
}

/// Sink variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Write captured output to the runner's stdout
    Stdout,

    /// POST the report to an external HTTP endpoint
    Webhook,
}

/// Delivery format for sinks that support both
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_spec_deserializes() {
        let spec: SinkSpec =
            serde_json::from_str(r#"{"kind": "stdout", "format": "json", "url": null}"#).unwrap();
        assert_eq!(spec.kind, SinkKind::Stdout);
        assert_eq!(spec.format, Some(OutputFormat::Json));
        assert!(spec.url.is_none());
    }
}
