//! End-to-end reporting run.
//!
//! ```text
//! Reporter::report(cancel, connector, metadata, set)
//!   → metadata.validate()          : before any backend activity
//!   → with_client(connector)       : open once, close exactly once
//!       → reconcile(catalog)       : every descriptor confirmed or created
//!       → build_batch(set, now)    : 3 points per benchmark, one timestamp
//!       → upload(batch)            : single submission
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::catalog::MetricCatalog;
use crate::client::{with_client, BackendConnector, MetricBackend};
use crate::error::ReportResult;
use crate::model::{BenchmarkSet, RunMetadata};
use crate::reconcile::DescriptorReconciler;
use crate::timeseries::capture_timestamp;
use crate::upload::{build_batch, upload};

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub descriptors_created: usize,
    pub points_written: usize,
}

/// Drives reconciliation and submission for one benchmark set.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    catalog: MetricCatalog,
    reconciler: DescriptorReconciler,
}

impl Reporter {
    pub fn new(catalog: MetricCatalog, reconciler: DescriptorReconciler) -> Self {
        Self {
            catalog,
            reconciler,
        }
    }

    /// Standard catalog with a custom per-call deadline.
    pub fn with_call_timeout(call_timeout: Duration) -> Self {
        Self::new(
            MetricCatalog::standard(),
            DescriptorReconciler::new(call_timeout),
        )
    }

    /// Open a client, publish `set`, and close the client.
    pub async fn report<C>(
        &self,
        cancel: &CancellationToken,
        connector: &C,
        metadata: &RunMetadata,
        set: &BenchmarkSet,
    ) -> ReportResult<ReportSummary>
    where
        C: BackendConnector + ?Sized,
    {
        metadata.validate()?;

        let project_id = metadata.project_id.as_str();
        with_client(connector, project_id, |backend| async move {
            self.publish(cancel, backend, metadata, set).await
        })
        .await
    }

    /// Reconcile descriptors and submit the batch on an open backend.
    pub async fn publish(
        &self,
        cancel: &CancellationToken,
        backend: Arc<dyn MetricBackend>,
        metadata: &RunMetadata,
        set: &BenchmarkSet,
    ) -> ReportResult<ReportSummary> {
        let project_id = metadata.project_id.as_str();

        let reconciled = self
            .reconciler
            .reconcile(cancel, backend.as_ref(), project_id, &self.catalog)
            .await?;
        info!(
            existing = reconciled.existing.len(),
            created = reconciled.created.len(),
            "metric descriptors reconciled"
        );

        let timestamp = capture_timestamp();
        let points = build_batch(set, metadata, &self.catalog, timestamp);
        let written = upload(cancel, backend.as_ref(), project_id, &points).await?;
        info!(
            project = %project_id,
            benchmarks = set.record_count(),
            points = written,
            "time series written"
        );

        Ok(ReportSummary {
            descriptors_created: reconciled.created.len(),
            points_written: written,
        })
    }
}
