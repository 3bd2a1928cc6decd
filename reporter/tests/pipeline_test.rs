//! End-to-end pipeline runs against the in-memory backend.
//!
//! No network: the in-memory backend records every call so the tests can
//! check what the pipeline asked for, and in which order it gave up.

use std::sync::atomic::Ordering;
use std::time::Duration;

use reporter::{
    BackendCall, BenchmarkRecord, BenchmarkSet, Faults, InMemoryBackend, MetricCatalog,
    ReportError, Reporter, RunMetadata, Stage, TypedValue,
};
use tokio_util::sync::CancellationToken;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn metadata() -> RunMetadata {
    RunMetadata::new("bench-project")
        .with_branch("main")
        .with_githash("deadbeef")
        .with_version("1.4.0")
}

fn benchmark_set() -> BenchmarkSet {
    let mut set = BenchmarkSet::new();
    set.push("BenchmarkEncode", BenchmarkRecord::new("BenchmarkEncode", 812.5, 256, 4));
    set.push("BenchmarkEncode", BenchmarkRecord::new("BenchmarkEncode", 799.0, 256, 4));
    set.push("BenchmarkDecode", BenchmarkRecord::new("BenchmarkDecode", 123.4, 56, 2));
    set.push("BenchmarkDecode", BenchmarkRecord::new("BenchmarkDecode", 130.1, 56, 2));
    set.push("BenchmarkDecode", BenchmarkRecord::new("BenchmarkDecode", 118.9, 48, 1));
    set
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_run_creates_descriptors_and_writes_points() {
    let backend = InMemoryBackend::new();
    let summary = Reporter::default()
        .report(&CancellationToken::new(), &backend, &metadata(), &benchmark_set())
        .await
        .unwrap();

    assert_eq!(summary.descriptors_created, 3);
    assert_eq!(summary.points_written, 15);

    let calls = backend.calls();
    assert_eq!(calls.open.load(Ordering::SeqCst), 1);
    assert_eq!(calls.get.load(Ordering::SeqCst), 3);
    assert_eq!(calls.create.load(Ordering::SeqCst), 3);
    assert_eq!(calls.submit.load(Ordering::SeqCst), 1);
    assert_eq!(calls.close.load(Ordering::SeqCst), 1);

    let batches = backend.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 15);
}

#[tokio::test]
async fn every_point_references_a_reconciled_descriptor() {
    let backend = InMemoryBackend::new();
    Reporter::default()
        .report(&CancellationToken::new(), &backend, &metadata(), &benchmark_set())
        .await
        .unwrap();

    let declared = backend.descriptor_types();
    let batch = &backend.batches()[0];
    assert!(batch.iter().all(|p| declared.contains(&p.metric_type)));

    let ts = batch[0].timestamp;
    assert!(batch.iter().all(|p| p.timestamp == ts));
    assert!(batch
        .iter()
        .all(|p| p.labels.get("githash").map(String::as_str) == Some("deadbeef")));
}

#[tokio::test]
async fn rerun_against_populated_backend_only_checks() {
    let catalog = MetricCatalog::standard();
    let backend = InMemoryBackend::seeded(catalog.descriptors());
    let reporter = Reporter::default();
    let cancel = CancellationToken::new();

    let first = reporter
        .report(&cancel, &backend, &metadata(), &benchmark_set())
        .await
        .unwrap();
    // The handle is closed after each run, so the second run uses a fresh backend
    // seeded with the same descriptors.
    let second_backend = InMemoryBackend::seeded(catalog.descriptors());
    let second = reporter
        .report(&cancel, &second_backend, &metadata(), &benchmark_set())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.descriptors_created, 0);
    for b in [&backend, &second_backend] {
        assert_eq!(b.calls().get.load(Ordering::SeqCst), 3);
        assert_eq!(b.calls().create.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn integer_metrics_are_int64_points() {
    let backend = InMemoryBackend::new();
    let mut set = BenchmarkSet::new();
    set.push("BenchmarkFoo", BenchmarkRecord::new("BenchmarkFoo", 123.4, 56, 2));

    Reporter::default()
        .report(&CancellationToken::new(), &backend, &metadata(), &set)
        .await
        .unwrap();

    let values: Vec<_> = backend.batches()[0].iter().map(|p| p.value).collect();
    assert_eq!(
        values,
        [
            TypedValue::Double(123.4),
            TypedValue::Int64(56),
            TypedValue::Int64(2)
        ]
    );
}

// ── Failure injection ────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_project_fails_before_any_backend_call() {
    let backend = InMemoryBackend::new();
    let err = Reporter::default()
        .report(
            &CancellationToken::new(),
            &backend,
            &RunMetadata::new(""),
            &benchmark_set(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Configuration);
    let calls = backend.calls();
    assert_eq!(calls.open.load(Ordering::SeqCst), 0);
    assert_eq!(calls.get.load(Ordering::SeqCst), 0);
    assert_eq!(calls.close.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn hung_existence_check_times_out_without_submission() {
    let backend = InMemoryBackend::with_faults(Faults {
        hang_get: true,
        ..Default::default()
    });
    let err = Reporter::with_call_timeout(Duration::from_secs(30))
        .report(&CancellationToken::new(), &backend, &metadata(), &benchmark_set())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReportError::Timeout {
            call: BackendCall::GetDescriptor,
            ..
        }
    ));
    assert_eq!(backend.calls().submit.load(Ordering::SeqCst), 0);
    assert_eq!(backend.calls().close.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_descriptor_creation_submits_nothing() {
    let backend = InMemoryBackend::with_faults(Faults {
        fail_create: true,
        ..Default::default()
    });
    let err = Reporter::default()
        .report(&CancellationToken::new(), &backend, &metadata(), &benchmark_set())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Reconciliation);
    assert_eq!(backend.calls().submit.load(Ordering::SeqCst), 0);
    assert!(backend.batches().is_empty());
}

#[tokio::test]
async fn close_runs_once_when_upload_fails() {
    let backend = InMemoryBackend::with_faults(Faults {
        fail_submit: true,
        ..Default::default()
    });
    let err = Reporter::default()
        .report(&CancellationToken::new(), &backend, &metadata(), &benchmark_set())
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Submission(_)));
    assert_eq!(backend.calls().submit.load(Ordering::SeqCst), 1);
    assert_eq!(backend.calls().close.load(Ordering::SeqCst), 1);
    assert!(backend.is_closed());
}

#[tokio::test]
async fn close_failure_after_successful_upload_keeps_the_batch() {
    let backend = InMemoryBackend::with_faults(Faults {
        fail_close: true,
        ..Default::default()
    });
    let err = Reporter::default()
        .report(&CancellationToken::new(), &backend, &metadata(), &benchmark_set())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Close);
    assert_eq!(backend.batches().len(), 1);
}

#[tokio::test]
async fn connection_failure_is_fatal() {
    let backend = InMemoryBackend::with_faults(Faults {
        fail_open: true,
        ..Default::default()
    });
    let err = Reporter::default()
        .report(&CancellationToken::new(), &backend, &metadata(), &benchmark_set())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Connection);
    assert_eq!(backend.calls().get.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn outer_cancellation_aborts_reconciliation() {
    let backend = InMemoryBackend::with_faults(Faults {
        hang_get: true,
        ..Default::default()
    });
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        trigger.cancel();
    });

    let err = Reporter::default()
        .report(&cancel, &backend, &metadata(), &benchmark_set())
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(backend.calls().submit.load(Ordering::SeqCst), 0);
    assert_eq!(backend.calls().close.load(Ordering::SeqCst), 1);
}
