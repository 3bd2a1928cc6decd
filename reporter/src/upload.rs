//! Batched time-series submission.
//!
//! All points of a run go out in one `create_time_series` call. No
//! chunking is applied: a batch over the backend's per-request limit is
//! rejected by the backend and surfaces as a submission error.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::MetricCatalog;
use crate::client::MetricBackend;
use crate::deadline;
use crate::error::{BackendCall, ReportError, ReportResult};
use crate::model::{BenchmarkSet, RunMetadata, TimePoint};
use crate::timeseries::build_points;

/// Flatten every benchmark of the set into one ordered batch.
pub fn build_batch(
    set: &BenchmarkSet,
    metadata: &RunMetadata,
    catalog: &MetricCatalog,
    timestamp: DateTime<Utc>,
) -> Vec<TimePoint> {
    set.records()
        .flat_map(|record| build_points(record, metadata, catalog, timestamp))
        .collect()
}

/// Submit `points` in a single call. Returns the number of points written.
pub async fn upload(
    cancel: &CancellationToken,
    backend: &dyn MetricBackend,
    project_id: &str,
    points: &[TimePoint],
) -> ReportResult<usize> {
    if points.is_empty() {
        info!(project = %project_id, "no benchmark points to write");
        return Ok(0);
    }

    debug!(
        backend = backend.name(),
        project = %project_id,
        points = points.len(),
        "writing time series"
    );
    let write = backend.create_time_series(project_id, points);
    deadline::until_cancelled(BackendCall::CreateTimeSeries, cancel, write)
        .await?
        .map_err(ReportError::Submission)?;

    Ok(points.len())
}
