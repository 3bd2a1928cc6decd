//! Backend client lifecycle.
//!
//! [`MetricBackend`] is the seam between the pipeline and the monitoring
//! service: the REST client in [`crate::stackdriver`] and the in-memory
//! backend in [`crate::memory`] both implement it. A handle is opened once
//! per run by a [`BackendConnector`] and must be closed exactly once.
//!
//! ## Lifecycle
//!
//! ```text
//! with_client(connector, project, body)
//!   → connector.open(project)        : ReportError::Connection on failure
//!   → body(backend)                  : reconcile + upload
//!   → backend.close()                : always, even when body failed
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::catalog::MetricDescriptor;
use crate::error::{BackendError, ReportError, ReportResult};
use crate::model::TimePoint;

/// Operations the pipeline needs from the monitoring backend.
///
/// All calls are scoped to a project. Handles are shared read-only across
/// calls and must not be used after [`close`](MetricBackend::close).
#[async_trait]
pub trait MetricBackend: Send + Sync {
    /// Short backend name for logging (e.g. `"stackdriver"`).
    fn name(&self) -> &'static str;

    /// Check that a descriptor exists. Absence is [`BackendError::NotFound`].
    async fn get_metric_descriptor(
        &self,
        project_id: &str,
        metric_type: &str,
    ) -> Result<(), BackendError>;

    /// Declare a new metric descriptor.
    async fn create_metric_descriptor(
        &self,
        project_id: &str,
        descriptor: &MetricDescriptor,
    ) -> Result<(), BackendError>;

    /// Write a batch of points in a single request.
    async fn create_time_series(
        &self,
        project_id: &str,
        points: &[TimePoint],
    ) -> Result<(), BackendError>;

    /// Release the underlying connection.
    async fn close(&self) -> Result<(), BackendError>;
}

/// Opens backend handles.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    async fn open(&self, project_id: &str) -> Result<Arc<dyn MetricBackend>, BackendError>;
}

/// Open a backend, run `body` against it, and close it exactly once.
///
/// A body error takes precedence over a close error; the close error is
/// only logged in that case. A close failure after a successful body is
/// returned as [`ReportError::Close`] and does not undo the body's work.
pub async fn with_client<C, F, Fut, T>(
    connector: &C,
    project_id: &str,
    body: F,
) -> ReportResult<T>
where
    C: BackendConnector + ?Sized,
    F: FnOnce(Arc<dyn MetricBackend>) -> Fut,
    Fut: Future<Output = ReportResult<T>>,
{
    let backend = connector
        .open(project_id)
        .await
        .map_err(ReportError::Connection)?;
    debug!(backend = backend.name(), project = %project_id, "metric client opened");

    let outcome = body(Arc::clone(&backend)).await;
    let closed = backend.close().await;

    match (outcome, closed) {
        (Ok(value), Ok(())) => {
            debug!(backend = backend.name(), "metric client closed");
            Ok(value)
        }
        (Ok(_), Err(e)) => Err(ReportError::Close(e)),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            warn!(
                backend = backend.name(),
                error = %close_err,
                "failed to close metric client after earlier error"
            );
            Err(e)
        }
    }
}
