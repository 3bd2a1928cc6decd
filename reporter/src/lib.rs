//! Benchmark Reporter Library
//!
//! Publishes parsed benchmark results as Cloud Monitoring time series:
//! - Fixed catalog of benchmark metric descriptors (latency, bytes/op, allocs/op)
//! - Descriptor reconciliation with bounded, cancellable backend calls
//! - Point construction tagged with build metadata (branch, commit, version)
//! - Single-batch submission and guaranteed client release
//!
//! # Modules
//!
//! | Module        | Purpose                                                  |
//! |---------------|----------------------------------------------------------|
//! | `catalog`     | Immutable metric descriptor definitions                  |
//! | `model`       | Run metadata, benchmark records, points                  |
//! | `deadline`    | Racing a call against a timer and cancellation           |
//! | `reconcile`   | Ensure every descriptor exists before writing            |
//! | `timeseries`  | Benchmark record → typed, labeled points                 |
//! | `upload`      | One batched time-series write per run                    |
//! | `client`      | Backend trait and open/close lifecycle                   |
//! | `pipeline`    | End-to-end run                                           |
//! | `stackdriver` | Cloud Monitoring v3 REST backend                         |
//! | `memory`      | In-memory backend for dry runs and tests                 |
//!
//! # Usage
//!
//! ```rust,ignore
//! use reporter::{Reporter, RunMetadata, StackdriverConfig, StackdriverConnector};
//!
//! let connector = StackdriverConnector::new(StackdriverConfig::default());
//! let metadata = RunMetadata::new("my-project").with_branch("main");
//! let summary = Reporter::default()
//!     .report(&cancel, &connector, &metadata, &set)
//!     .await?;
//! ```

pub mod catalog;
pub mod client;
pub mod deadline;
pub mod error;
pub mod memory;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod stackdriver;
pub mod timeseries;
pub mod upload;

pub use catalog::{BenchmarkMetric, MetricCatalog, MetricDescriptor};
pub use client::{with_client, BackendConnector, MetricBackend};
pub use error::{BackendCall, BackendError, ReportError, ReportResult, Stage};
pub use memory::{Faults, InMemoryBackend};
pub use model::{BenchmarkRecord, BenchmarkSet, RunMetadata, TimePoint, TypedValue};
pub use pipeline::{ReportSummary, Reporter};
pub use reconcile::{DescriptorReconciler, ReconcileSummary};
pub use stackdriver::{StackdriverConfig, StackdriverConnector};
