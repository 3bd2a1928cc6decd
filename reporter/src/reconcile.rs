//! Descriptor reconciliation.
//!
//! Before any point is written, every catalog descriptor must exist on the
//! backend. Descriptors are processed sequentially in catalog order:
//!
//! ```text
//! for descriptor in catalog:
//!   get(type)      ── found ──────────────────────────→ next
//!        │
//!        └─ error ─→ create(descriptor) ── ok ─────────→ next
//!                                       └─ error ──────→ abort run
//! ```
//!
//! Each call is bounded by the per-call deadline and the run's
//! cancellation token; a timeout or cancellation aborts the whole
//! reconciliation. An existence check that fails for any reason, not only
//! "not found", is treated as an absent descriptor.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{MetricCatalog, MetricDescriptor};
use crate::client::MetricBackend;
use crate::deadline::{self, DEFAULT_CALL_TIMEOUT};
use crate::error::{BackendCall, ReportError, ReportResult};

/// What a reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Descriptors that already existed.
    pub existing: Vec<String>,
    /// Descriptors created by this pass.
    pub created: Vec<String>,
}

/// Ensures the backend declares every catalog descriptor.
#[derive(Debug, Clone)]
pub struct DescriptorReconciler {
    call_timeout: Duration,
}

impl Default for DescriptorReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_TIMEOUT)
    }
}

impl DescriptorReconciler {
    pub fn new(call_timeout: Duration) -> Self {
        Self { call_timeout }
    }

    pub async fn reconcile(
        &self,
        cancel: &CancellationToken,
        backend: &dyn MetricBackend,
        project_id: &str,
        catalog: &MetricCatalog,
    ) -> ReportResult<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();

        for descriptor in catalog.descriptors() {
            if self.exists(cancel, backend, project_id, descriptor).await? {
                debug!(metric_type = %descriptor.metric_type, "metric descriptor exists");
                summary.existing.push(descriptor.metric_type.clone());
                continue;
            }
            self.create(cancel, backend, project_id, descriptor).await?;
            info!(metric_type = %descriptor.metric_type, "created metric descriptor");
            summary.created.push(descriptor.metric_type.clone());
        }

        Ok(summary)
    }

    async fn exists(
        &self,
        cancel: &CancellationToken,
        backend: &dyn MetricBackend,
        project_id: &str,
        descriptor: &MetricDescriptor,
    ) -> ReportResult<bool> {
        let lookup = backend.get_metric_descriptor(project_id, &descriptor.metric_type);
        match deadline::race(BackendCall::GetDescriptor, self.call_timeout, cancel, lookup).await? {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => {
                // Transient failures fall through to creation; the create
                // call surfaces a real backend problem.
                warn!(
                    metric_type = %descriptor.metric_type,
                    error = %e,
                    "metric descriptor lookup failed, treating as absent"
                );
                Ok(false)
            }
        }
    }

    async fn create(
        &self,
        cancel: &CancellationToken,
        backend: &dyn MetricBackend,
        project_id: &str,
        descriptor: &MetricDescriptor,
    ) -> ReportResult<()> {
        let create = backend.create_metric_descriptor(project_id, descriptor);
        deadline::race(BackendCall::CreateDescriptor, self.call_timeout, cancel, create)
            .await?
            .map_err(|source| ReportError::CreateDescriptor {
                metric_type: descriptor.metric_type.clone(),
                source,
            })
    }
}
