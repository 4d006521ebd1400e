//! Result reporting service
//!
//! Fans a completed job's captured output out to every configured sink.
//! Sinks are independent: one sink failing is logged and never prevents
//! delivery to the rest.

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::error::ReportError;
use vigil_core::domain::job::JobReport;
use vigil_core::domain::sink::{OutputFormat, SinkKind, SinkSpec};

/// HTTP request timeout for a single webhook delivery attempt
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A destination for job reports
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short sink identifier used in delivery-failure logs
    fn name(&self) -> &'static str;

    /// Delivers one report to this sink
    async fn deliver(&self, report: &JobReport) -> Result<(), ReportError>;
}

/// Renders a report as plain text for text-format sinks
fn render_text(report: &JobReport) -> String {
    use std::fmt::Write;

    let revision = report
        .revision
        .as_ref()
        .map(|r| r.as_str())
        .unwrap_or("unknown");

    let mut out = String::new();
    let _ = writeln!(
        out,
        "[{}] test '{}' {} at revision {} in {}ms",
        report.job_id, report.test_name, report.status, revision, report.duration_ms
    );
    if !report.stdout.is_empty() {
        let _ = writeln!(out, "{}", report.stdout.trim_end());
    }
    if !report.stderr.is_empty() {
        let _ = writeln!(out, "stderr: {}", report.stderr.trim_end());
    }
    out
}

/// Plain-text/stdout sink
///
/// The `json` format hint switches it to emitting the serialized report,
/// one document per line.
pub struct StdoutSink {
    format: OutputFormat,
}

impl StdoutSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

#[async_trait]
impl Sink for StdoutSink {
    fn name(&self) -> &'static str {
        "stdout"
    }

    async fn deliver(&self, report: &JobReport) -> Result<(), ReportError> {
        match self.format {
            OutputFormat::Text => print!("{}", render_text(report)),
            OutputFormat::Json => println!("{}", serde_json::to_string(report)?),
        }
        Ok(())
    }
}

/// Structured sink: POSTs the report to an external HTTP endpoint
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
    format: OutputFormat,
}

impl WebhookSink {
    pub fn new(url: String, format: OutputFormat) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url,
            format,
        })
    }
}

#[async_trait]
impl Sink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, report: &JobReport) -> Result<(), ReportError> {
        let request = match self.format {
            OutputFormat::Json => self.client.post(&self.url).json(report),
            OutputFormat::Text => self
                .client
                .post(&self.url)
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(render_text(report)),
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ReportError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Forwards job reports to all configured sinks
pub struct Reporter {
    sinks: Vec<Box<dyn Sink>>,
}

impl Reporter {
    /// Builds the sink set from configuration
    pub fn from_specs(specs: &[SinkSpec]) -> Result<Self, ReportError> {
        let mut sinks: Vec<Box<dyn Sink>> = Vec::new();
        for spec in specs {
            let format = spec.format.unwrap_or_default();
            match spec.kind {
                SinkKind::Stdout => sinks.push(Box::new(StdoutSink::new(format))),
                SinkKind::Webhook => {
                    let url = spec.url.clone().ok_or(ReportError::MissingUrl)?;
                    sinks.push(Box::new(WebhookSink::new(url, format)?));
                }
            }
        }
        Ok(Self { sinks })
    }

    /// Builds a reporter over an explicit sink set
    pub fn with_sinks(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { sinks }
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Delivers one report to every sink, continuing past per-sink failures
    pub async fn report(&self, report: &JobReport) {
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(report).await {
                warn!(
                    sink = sink.name(),
                    test = %report.test_name,
                    error = %e,
                    "Sink delivery failed"
                );
            }
        }
    }
}
