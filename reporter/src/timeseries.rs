//! Mapping benchmark records onto typed, labeled points.

use chrono::{DateTime, SubsecRound, Utc};

use crate::catalog::{BenchmarkMetric, MetricCatalog};
use crate::model::{
    BenchmarkRecord, LabelSet, MonitoredResource, RunMetadata, TimePoint, TypedValue,
};

/// The timestamp shared by every point of one upload, at second precision.
pub fn capture_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Labels for one benchmark: the run's build metadata plus the benchmark name.
pub fn labels_for(record: &BenchmarkRecord, metadata: &RunMetadata) -> LabelSet {
    [
        ("branch", metadata.branch.as_str()),
        ("githash", metadata.githash.as_str()),
        ("version", metadata.version.as_str()),
        ("name", record.name.as_str()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Counts above `i64::MAX` saturate rather than wrap.
fn to_int64(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Build the latency, bytes/op and allocs/op points for one benchmark.
pub fn build_points(
    record: &BenchmarkRecord,
    metadata: &RunMetadata,
    catalog: &MetricCatalog,
    timestamp: DateTime<Utc>,
) -> Vec<TimePoint> {
    let labels = labels_for(record, metadata);
    let resource = MonitoredResource::global(&metadata.project_id);

    BenchmarkMetric::ALL
        .into_iter()
        .map(|metric| {
            let value = match metric {
                BenchmarkMetric::Latency => TypedValue::Double(record.ns_per_op),
                BenchmarkMetric::AllocatedBytes => {
                    TypedValue::Int64(to_int64(record.alloced_bytes_per_op))
                }
                BenchmarkMetric::Allocations => TypedValue::Int64(to_int64(record.allocs_per_op)),
            };
            TimePoint {
                metric_type: catalog.get(metric).metric_type.clone(),
                labels: labels.clone(),
                resource: resource.clone(),
                timestamp,
                value,
            }
        })
        .collect()
}
