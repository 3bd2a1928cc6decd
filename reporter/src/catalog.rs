//! The fixed set of benchmark metrics published to the backend.
//!
//! The catalog is built once at startup with [`MetricCatalog::standard`]
//! and passed by reference to the reconciler and the point builder. Both
//! depend on it as their contract: the reconciler makes sure each entry
//! exists on the backend, the builder only emits points for these types.

use serde::{Deserialize, Serialize};

/// Prefix shared by every custom benchmark metric type.
pub const METRIC_TYPE_PREFIX: &str = "custom.googleapis.com/benchmark/";

/// Label keys carried by every benchmark point, in schema order.
pub const LABEL_KEYS: [&str; 4] = ["branch", "githash", "version", "name"];

/// The three benchmark metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkMetric {
    /// Nanoseconds per operation.
    Latency,
    /// Heap bytes allocated per operation.
    AllocatedBytes,
    /// Heap allocations per operation.
    Allocations,
}

impl BenchmarkMetric {
    pub const ALL: [BenchmarkMetric; 3] = [Self::Latency, Self::AllocatedBytes, Self::Allocations];

    pub fn metric_type(self) -> String {
        let suffix = match self {
            Self::Latency => "ns_per_op",
            Self::AllocatedBytes => "allocated_bytes_per_op",
            Self::Allocations => "allocations_per_op",
        };
        format!("{METRIC_TYPE_PREFIX}{suffix}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricKind {
    Gauge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    Double,
    Int64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LabelValueType {
    String,
}

/// One declared label of a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDescriptor {
    pub key: String,
    pub value_type: LabelValueType,
    pub description: String,
}

impl LabelDescriptor {
    fn string(key: &str, description: &str) -> Self {
        Self {
            key: key.to_string(),
            value_type: LabelValueType::String,
            description: description.to_string(),
        }
    }
}

/// Backend-side schema declaration for one metric.
///
/// Serializes to the Cloud Monitoring `MetricDescriptor` JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDescriptor {
    #[serde(rename = "type")]
    pub metric_type: String,
    pub labels: Vec<LabelDescriptor>,
    pub metric_kind: MetricKind,
    pub value_type: ValueType,
    pub unit: String,
    pub description: String,
    pub display_name: String,
}

impl MetricDescriptor {
    /// Label keys in schema order.
    pub fn label_keys(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|l| l.key.as_str())
    }
}

fn benchmark_labels() -> Vec<LabelDescriptor> {
    vec![
        LabelDescriptor::string("branch", "Git branch"),
        LabelDescriptor::string("githash", "Git hash"),
        LabelDescriptor::string("version", "Release Version"),
        LabelDescriptor::string("name", "Benchmark name"),
    ]
}

/// Immutable catalog of the metric descriptors, in reconciliation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricCatalog {
    latency: MetricDescriptor,
    allocated_bytes: MetricDescriptor,
    allocations: MetricDescriptor,
}

impl MetricCatalog {
    /// The latency, bytes/op and allocs/op descriptors.
    pub fn standard() -> Self {
        Self {
            latency: Self::descriptor_for(BenchmarkMetric::Latency),
            allocated_bytes: Self::descriptor_for(BenchmarkMetric::AllocatedBytes),
            allocations: Self::descriptor_for(BenchmarkMetric::Allocations),
        }
    }

    fn descriptor_for(metric: BenchmarkMetric) -> MetricDescriptor {
        let (value_type, unit, description) = match metric {
            BenchmarkMetric::Latency => (ValueType::Double, "ns", "Nanoseconds Per Operation"),
            BenchmarkMetric::AllocatedBytes => {
                (ValueType::Int64, "By", "Allocated Bytes Per Operation")
            }
            BenchmarkMetric::Allocations => (ValueType::Int64, "1", "Allocations Per Operation"),
        };
        MetricDescriptor {
            metric_type: metric.metric_type(),
            labels: benchmark_labels(),
            metric_kind: MetricKind::Gauge,
            value_type,
            unit: unit.to_string(),
            description: description.to_string(),
            display_name: format!("Benchmark {description}"),
        }
    }

    pub fn get(&self, metric: BenchmarkMetric) -> &MetricDescriptor {
        match metric {
            BenchmarkMetric::Latency => &self.latency,
            BenchmarkMetric::AllocatedBytes => &self.allocated_bytes,
            BenchmarkMetric::Allocations => &self.allocations,
        }
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &MetricDescriptor> {
        BenchmarkMetric::ALL.into_iter().map(move |m| self.get(m))
    }

    pub fn len(&self) -> usize {
        BenchmarkMetric::ALL.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
