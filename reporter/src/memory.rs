//! In-memory metric backend.
//!
//! Keeps declared descriptors and written points in process memory. Used
//! for `--dry-run` and as the fake handle in tests, where the call
//! counters and [`Faults`] let a test observe exactly which requests the
//! pipeline issued and inject failures at each call.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::info;

use crate::catalog::MetricDescriptor;
use crate::client::{BackendConnector, MetricBackend};
use crate::error::BackendError;
use crate::model::TimePoint;

/// Failures to inject, one switch per backend call.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub fail_open: bool,
    /// Existence checks fail with a transient error instead of "not found".
    pub fail_get: bool,
    /// Existence checks never complete.
    pub hang_get: bool,
    pub fail_create: bool,
    pub hang_create: bool,
    pub fail_submit: bool,
    pub fail_close: bool,
}

/// Number of times each call was issued.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub open: AtomicUsize,
    pub get: AtomicUsize,
    pub create: AtomicUsize,
    pub submit: AtomicUsize,
    pub close: AtomicUsize,
}

#[derive(Debug, Default)]
struct Inner {
    descriptors: Mutex<BTreeMap<String, MetricDescriptor>>,
    batches: Mutex<Vec<Vec<TimePoint>>>,
    calls: CallCounts,
    faults: Faults,
    closed: AtomicBool,
}

/// Thread-safe in-memory backend. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking test thread must not hide the recorded state from others.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: Faults) -> Self {
        Self {
            inner: Arc::new(Inner {
                faults,
                ..Default::default()
            }),
        }
    }

    /// Pre-declare descriptors, as if a previous run had created them.
    pub fn seeded<'a>(descriptors: impl IntoIterator<Item = &'a MetricDescriptor>) -> Self {
        let backend = Self::new();
        {
            let mut stored = lock(&backend.inner.descriptors);
            for d in descriptors {
                stored.insert(d.metric_type.clone(), d.clone());
            }
        }
        backend
    }

    pub fn calls(&self) -> &CallCounts {
        &self.inner.calls
    }

    /// Declared descriptor types, sorted.
    pub fn descriptor_types(&self) -> Vec<String> {
        lock(&self.inner.descriptors).keys().cloned().collect()
    }

    /// Every batch accepted by `create_time_series`, in submission order.
    pub fn batches(&self) -> Vec<Vec<TimePoint>> {
        lock(&self.inner.batches).clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), BackendError> {
        if self.is_closed() {
            return Err(BackendError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl MetricBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_metric_descriptor(
        &self,
        _project_id: &str,
        metric_type: &str,
    ) -> Result<(), BackendError> {
        self.inner.calls.get.fetch_add(1, Ordering::SeqCst);
        self.ensure_open()?;
        if self.inner.faults.hang_get {
            std::future::pending::<()>().await;
        }
        if self.inner.faults.fail_get {
            return Err(BackendError::Status {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        if lock(&self.inner.descriptors).contains_key(metric_type) {
            Ok(())
        } else {
            Err(BackendError::NotFound(metric_type.to_string()))
        }
    }

    async fn create_metric_descriptor(
        &self,
        _project_id: &str,
        descriptor: &MetricDescriptor,
    ) -> Result<(), BackendError> {
        self.inner.calls.create.fetch_add(1, Ordering::SeqCst);
        self.ensure_open()?;
        if self.inner.faults.hang_create {
            std::future::pending::<()>().await;
        }
        if self.inner.faults.fail_create {
            return Err(BackendError::Status {
                status: 403,
                message: "permission denied".to_string(),
            });
        }
        lock(&self.inner.descriptors).insert(descriptor.metric_type.clone(), descriptor.clone());
        Ok(())
    }

    async fn create_time_series(
        &self,
        project_id: &str,
        points: &[TimePoint],
    ) -> Result<(), BackendError> {
        self.inner.calls.submit.fetch_add(1, Ordering::SeqCst);
        self.ensure_open()?;
        if self.inner.faults.fail_submit {
            return Err(BackendError::Status {
                status: 400,
                message: "invalid time series".to_string(),
            });
        }
        info!(
            project = %project_id,
            points = points.len(),
            "in-memory backend accepted time series batch"
        );
        lock(&self.inner.batches).push(points.to_vec());
        Ok(())
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.inner.calls.close.fetch_add(1, Ordering::SeqCst);
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Err(BackendError::Closed);
        }
        if self.inner.faults.fail_close {
            return Err(BackendError::Transport("connection reset on close".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BackendConnector for InMemoryBackend {
    async fn open(&self, _project_id: &str) -> Result<Arc<dyn MetricBackend>, BackendError> {
        self.inner.calls.open.fetch_add(1, Ordering::SeqCst);
        if self.inner.faults.fail_open {
            return Err(BackendError::Credentials(
                "no credentials configured".to_string(),
            ));
        }
        Ok(Arc::new(self.clone()))
    }
}
