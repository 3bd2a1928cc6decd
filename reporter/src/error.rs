//! Error taxonomy for the reporting pipeline.
//!
//! Backend calls fail with [`BackendError`]; the pipeline wraps those with
//! operation context into [`ReportError`]. Callers can ask which pipeline
//! stage failed via [`ReportError::stage`] without string matching.
//!
//! | Stage          | Raised by                                   |
//! |----------------|---------------------------------------------|
//! | Configuration  | metadata validation, before any network I/O |
//! | Connection     | opening the backend client                  |
//! | Reconciliation | descriptor existence checks and creation    |
//! | Submission     | the batched time-series write               |
//! | Close          | releasing the backend client                |
//!
//! Nothing here is retried. A single deadline per call is the only
//! resilience mechanism.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// The individual backend calls the pipeline issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendCall {
    GetDescriptor,
    CreateDescriptor,
    CreateTimeSeries,
}

impl fmt::Display for BackendCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetDescriptor => write!(f, "getting metric descriptor"),
            Self::CreateDescriptor => write!(f, "creating metric descriptor"),
            Self::CreateTimeSeries => write!(f, "writing time series"),
        }
    }
}

/// Pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Configuration,
    Connection,
    Reconciliation,
    Submission,
    Close,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Connection => write!(f, "connection"),
            Self::Reconciliation => write!(f, "reconciliation"),
            Self::Submission => write!(f, "submission"),
            Self::Close => write!(f, "close"),
        }
    }
}

/// Failure reported by a [`MetricBackend`](crate::client::MetricBackend).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// Credentials could not be established.
    #[error("credentials unavailable: {0}")]
    Credentials(String),

    /// The handle was used after `close`.
    #[error("client already closed")]
    Closed,
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Unified error type for the reporting pipeline.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Run metadata is missing a required field.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The backend client could not be opened.
    #[error("creating metric client: {0}")]
    Connection(#[source] BackendError),

    /// A backend call did not finish inside its deadline.
    #[error("timed out {call} after {after:?}")]
    Timeout { call: BackendCall, after: Duration },

    /// The outer cancellation signal fired while a call was in flight.
    #[error("{call} cancelled")]
    Cancelled { call: BackendCall },

    /// A missing descriptor could not be created.
    #[error("creating metric descriptor {metric_type}: {source}")]
    CreateDescriptor {
        metric_type: String,
        #[source]
        source: BackendError,
    },

    /// The batched write was rejected; no point of the batch is considered written.
    #[error("failed to write time series data: {0}")]
    Submission(#[source] BackendError),

    /// Releasing the backend client failed.
    #[error("closing metric client: {0}")]
    Close(#[source] BackendError),
}

impl ReportError {
    /// Classify this error by the pipeline stage that raised it.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Configuration(_) => Stage::Configuration,
            Self::Connection(_) => Stage::Connection,
            Self::Timeout { call, .. } | Self::Cancelled { call } => match call {
                BackendCall::GetDescriptor | BackendCall::CreateDescriptor => {
                    Stage::Reconciliation
                }
                BackendCall::CreateTimeSeries => Stage::Submission,
            },
            Self::CreateDescriptor { .. } => Stage::Reconciliation,
            Self::Submission(_) => Stage::Submission,
            Self::Close(_) => Stage::Close,
        }
    }

    /// Returns `true` if the error was caused by outer cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
