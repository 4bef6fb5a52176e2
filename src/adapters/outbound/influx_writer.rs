//! InfluxDB Line Writer
//!
//! Implements LineWriter against the InfluxDB 1.x `/write` HTTP endpoint.
//! Credentials travel as `u`/`p` query parameters, not as an auth header.
//! In dry-run mode requests are rendered to a sink instead of sent.

use crate::domain::errors::DeliveryError;
use crate::domain::ports::LineWriter;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Default per-attempt timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Default number of attempts per batch.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Connection settings for the InfluxDB destination.
#[derive(Debug, Clone)]
pub struct InfluxSettings {
    /// Base URL (e.g., "http://localhost:8086"), with or without trailing slash
    pub url: String,
    /// Target database
    pub database: String,
    /// Optional username, sent as the `u` query parameter
    pub username: Option<String>,
    /// Optional password, sent as the `p` query parameter
    pub password: Option<String>,
    /// Timeout for each attempt
    pub timeout: Duration,
    /// Attempts per batch on transport errors (at least one is always made)
    pub max_attempts: u32,
    /// Render requests to the dry-run sink instead of sending them
    pub dry_run: bool,
}

impl Default for InfluxSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            database: "telegraf".to_string(),
            username: None,
            password: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            dry_run: false,
        }
    }
}

/// Shared text output for dry-run rendering. Defaults to stdout.
#[derive(Clone)]
pub struct DryRunSink {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl DryRunSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    fn render(&self, uri: &str, body: &str) -> std::io::Result<()> {
        let mut out = self.out.lock();
        writeln!(out, "{}", uri)?;
        writeln!(out, "{}", body)?;
        out.flush()
    }
}

impl Default for DryRunSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl std::fmt::Debug for DryRunSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DryRunSink").finish_non_exhaustive()
    }
}

/// HTTP client for the InfluxDB write endpoint.
pub struct InfluxWriter {
    settings: InfluxSettings,
    client: reqwest::Client,
    write_url: String,
    sink: DryRunSink,
}

impl InfluxWriter {
    /// Create a writer. Dry-run output goes to stdout unless replaced with [`with_sink`].
    ///
    /// [`with_sink`]: InfluxWriter::with_sink
    pub fn new(settings: InfluxSettings) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(DeliveryError::Client)?;

        let write_url = if settings.url.ends_with('/') {
            format!("{}write", settings.url)
        } else {
            format!("{}/write", settings.url)
        };

        Ok(Self {
            settings,
            client,
            write_url,
            sink: DryRunSink::stdout(),
        })
    }

    /// Replace the dry-run output sink.
    pub fn with_sink(mut self, sink: DryRunSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn settings(&self) -> &InfluxSettings {
        &self.settings
    }

    /// The `/write` endpoint, without query parameters.
    pub fn write_url(&self) -> &str {
        &self.write_url
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        self.settings
            .username
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| (u, self.settings.password.as_deref().unwrap_or_default()))
    }

    fn query(&self) -> Vec<(&'static str, &str)> {
        let mut query = vec![("db", self.settings.database.as_str())];
        if let Some((user, pass)) = self.credentials() {
            query.push(("u", user));
            query.push(("p", pass));
        }
        query
    }

    /// The URI printed in dry-run mode.
    pub fn dry_run_uri(&self) -> String {
        let mut uri = format!("{}?db={}", self.write_url, self.settings.database);
        if let Some((user, pass)) = self.credentials() {
            uri.push_str(&format!("&u={}&p={}", user, pass));
        }
        uri
    }

    fn dump(&self, lines: &Bytes) {
        let body = String::from_utf8_lossy(lines);
        if let Err(e) = self.sink.render(&self.dry_run_uri(), body.trim_end_matches('\n')) {
            tracing::warn!("dry-run output failed: {}", e);
        }
    }

    async fn post(&self, lines: Bytes) -> Result<(), DeliveryError> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;

        let response = loop {
            let result = self
                .client
                .post(&self.write_url)
                .query(&self.query())
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(lines.clone())
                .send()
                .await;

            match result {
                Ok(response) => break response,
                Err(source) if attempt >= max_attempts => {
                    return Err(DeliveryError::Transport {
                        url: self.settings.url.clone(),
                        attempts: attempt,
                        source,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "influx write attempt {}/{} failed: {}",
                        attempt,
                        max_attempts,
                        e
                    );
                    attempt += 1;
                }
            }
        };

        if response.status() != StatusCode::NO_CONTENT {
            return Err(DeliveryError::Rejected {
                url: self.settings.url.clone(),
                status: response.status(),
            });
        }

        tracing::debug!(
            "wrote {} bytes to {} in {} attempt(s)",
            lines.len(),
            self.settings.url,
            attempt
        );
        Ok(())
    }
}

#[async_trait]
impl LineWriter for InfluxWriter {
    async fn send(&self, lines: Bytes) -> Result<(), DeliveryError> {
        if self.settings.dry_run {
            self.dump(&lines);
            return Ok(());
        }
        self.post(lines).await
    }
}
