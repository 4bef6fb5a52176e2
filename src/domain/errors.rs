//! Pipeline Errors
//!
//! Failure taxonomy for the collect → parse → buffer → deliver pipeline.
//! Everything except [`DeliveryError`] is fatal to the polling loop.

use thiserror::Error;

/// The external collector could not produce a snapshot.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("collector command is empty")]
    EmptyCommand,
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    ExitStatus {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// A snapshot contained malformed data.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("error while parsing {field}: missing or empty")]
    Missing { field: &'static str },
    #[error("error while parsing {field}: invalid number {value:?}")]
    Number { field: &'static str, value: String },
    #[error("error while parsing {field}: invalid rate {value:?}")]
    Rate { field: &'static str, value: String },
    #[error("error while parsing {field}: invalid timestamp {value:?}: {source}")]
    Timestamp {
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// The point backlog rejected a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("max cached points reached: {pending} pending + {incoming} incoming > {max}")]
    CapacityExceeded {
        pending: usize,
        incoming: usize,
        max: usize,
    },
}

/// A batch could not be delivered. Recoverable: the backlog is kept.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("write to {url} failed after {attempts} attempt(s): {source}")]
    Transport {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("unable to write to {url}, got response: {status}")]
    Rejected {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// Terminal condition of the polling loop.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Collection(#[from] CollectError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Capacity(#[from] BufferError),
    #[error("context cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Whether the loop stopped because shutdown was requested.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}
