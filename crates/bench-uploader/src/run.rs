//! Process wiring: report input → parsed set → reporter pipeline.

use std::fs::File;
use std::io::{self, BufReader};

use anyhow::{Context, Result};
use reporter::{
    BackendConnector, BenchmarkSet, InMemoryBackend, ReportSummary, Reporter, StackdriverConnector,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Cli;
use crate::parse::parse_set;

/// Read and parse the benchmark report named by the CLI (stdin by default).
pub async fn read_report(cli: &Cli) -> Result<BenchmarkSet> {
    let input = cli.input.clone();
    let set = tokio::task::spawn_blocking(move || match input {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open benchmark report {}", path.display()))?;
            parse_set(BufReader::new(file)).context("Failed to parse benchmark set")
        }
        None => parse_set(io::stdin().lock()).context("Failed to parse benchmark set"),
    })
    .await
    .context("Benchmark report reader panicked")??;

    info!(
        suites = set.suite_count(),
        benchmarks = set.record_count(),
        "parsed benchmark report"
    );
    if set.is_empty() {
        warn!("benchmark report contained no benchmark lines");
    }
    Ok(set)
}

/// Publish `set` with the backend selected by the CLI.
pub async fn publish(
    cli: &Cli,
    set: &BenchmarkSet,
    cancel: &CancellationToken,
) -> Result<ReportSummary> {
    let metadata = cli.metadata();
    let reporter = Reporter::with_call_timeout(cli.call_timeout());

    let connector: Box<dyn BackendConnector> = if cli.dry_run {
        info!("dry run: writing to in-memory backend");
        Box::new(InMemoryBackend::new())
    } else {
        Box::new(StackdriverConnector::new(cli.backend_config()))
    };

    let summary = reporter
        .report(cancel, connector.as_ref(), &metadata, set)
        .await
        .context("Failed to upload benchmarks")?;
    Ok(summary)
}
