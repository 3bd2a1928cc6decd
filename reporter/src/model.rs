//! Data model shared by the reconciler, the point builder and the uploader.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, ReportResult};

/// Build metadata attached to every point of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub project_id: String,
    pub branch: String,
    pub githash: String,
    pub version: String,
}

impl RunMetadata {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_githash(mut self, githash: impl Into<String>) -> Self {
        self.githash = githash.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Reject metadata that cannot scope any backend request.
    pub fn validate(&self) -> ReportResult<()> {
        if self.project_id.trim().is_empty() {
            return Err(ReportError::Configuration(
                "projectID must be set".to_string(),
            ));
        }
        Ok(())
    }
}

/// One benchmark function's measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub name: String,
    pub ns_per_op: f64,
    pub alloced_bytes_per_op: u64,
    pub allocs_per_op: u64,
}

impl BenchmarkRecord {
    pub fn new(
        name: impl Into<String>,
        ns_per_op: f64,
        alloced_bytes_per_op: u64,
        allocs_per_op: u64,
    ) -> Self {
        Self {
            name: name.into(),
            ns_per_op,
            alloced_bytes_per_op,
            allocs_per_op,
        }
    }
}

/// Benchmark records grouped by suite identifier.
///
/// Backed by a `BTreeMap` so iteration order is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSet {
    suites: BTreeMap<String, Vec<BenchmarkRecord>>,
}

impl BenchmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to a suite, creating the suite on first use.
    pub fn push(&mut self, suite: impl Into<String>, record: BenchmarkRecord) {
        self.suites.entry(suite.into()).or_default().push(record);
    }

    pub fn suites(&self) -> impl Iterator<Item = (&str, &[BenchmarkRecord])> {
        self.suites
            .iter()
            .map(|(suite, records)| (suite.as_str(), records.as_slice()))
    }

    /// All records, suite by suite, in insertion order within a suite.
    pub fn records(&self) -> impl Iterator<Item = &BenchmarkRecord> {
        self.suites.values().flatten()
    }

    pub fn suite_count(&self) -> usize {
        self.suites.len()
    }

    pub fn record_count(&self) -> usize {
        self.suites.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

/// Label name to value, ordered for stable serialization.
pub type LabelSet = BTreeMap<String, String>;

/// The entity a point is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub labels: LabelSet,
}

impl MonitoredResource {
    /// The fixed "global" resource scoped by project.
    pub fn global(project_id: &str) -> Self {
        let mut labels = LabelSet::new();
        labels.insert("project_id".to_string(), project_id.to_string());
        Self {
            resource_type: "global".to_string(),
            labels,
        }
    }
}

/// A point value matching the descriptor's value kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypedValue {
    Double(f64),
    Int64(i64),
}

/// One timestamped, labeled, typed value for a declared metric type.
#[derive(Debug, Clone, PartialEq)]
pub struct TimePoint {
    pub metric_type: String,
    pub labels: LabelSet,
    pub resource: MonitoredResource,
    pub timestamp: DateTime<Utc>,
    pub value: TypedValue,
}
