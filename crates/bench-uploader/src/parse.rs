//! Go benchmark report parsing.
//!
//! Reads `go test -bench` output line by line and collects one
//! [`BenchmarkRecord`] per recognized benchmark line:
//!
//! ```text
//! BenchmarkDecode-8   	 1000000	      1234 ns/op	     56 B/op	       2 allocs/op
//! └─ name ─────────┘    └ iters ┘  └─ value/unit pairs, in any order ────────────┘
//! ```
//!
//! Only the name and the iteration count are required. Each value/unit pair
//! is read on its own: a pair that does not parse is dropped and the rest of
//! the line is kept, and a measurement that never appears stays zero.
//!
//! Everything else (`goos:`, `PASS`, `ok  pkg 1.2s`) is ignored. Records
//! are grouped under their benchmark name; repeated runs (`-count=N`)
//! append to the same group.

use std::io::BufRead;
use std::sync::LazyLock;

use regex::Regex;
use reporter::{BenchmarkRecord, BenchmarkSet};
use thiserror::Error;
use tracing::debug;

static BENCHMARK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>Benchmark\S*)\s+(?P<iters>\d+)(?:\s+(?P<measurements>.*))?$")
        .expect("BENCHMARK_LINE regex should compile")
});

/// Failure reading the report stream.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("reading benchmark report at line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Parse a full report into a benchmark set.
pub fn parse_set<R: BufRead>(reader: R) -> Result<BenchmarkSet, ParseError> {
    let mut set = BenchmarkSet::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| ParseError::Io {
            line: idx + 1,
            source,
        })?;
        if !line.starts_with("Benchmark") {
            continue;
        }
        match parse_line(&line) {
            Some(record) => set.push(record.name.clone(), record),
            None => debug!(line = idx + 1, text = %line, "skipping unparseable benchmark line"),
        }
    }
    Ok(set)
}

/// Parse one benchmark line, or `None` if it lacks a name and an integer
/// iteration count.
///
/// Fractional `B/op` and `allocs/op` values are truncated toward zero.
/// Units other than `ns/op`, `B/op` and `allocs/op` (e.g. `MB/s`) are ignored,
/// as is a trailing value without a unit.
pub fn parse_line(line: &str) -> Option<BenchmarkRecord> {
    let caps = BENCHMARK_LINE.captures(line.trim_end())?;
    caps["iters"].parse::<u64>().ok()?;

    let mut record = BenchmarkRecord::new(&caps["name"], 0.0, 0, 0);
    let measurements = caps.name("measurements").map_or("", |m| m.as_str());
    let fields: Vec<&str> = measurements.split_whitespace().collect();
    for pair in fields.chunks_exact(2) {
        apply_measurement(&mut record, pair[0], pair[1]);
    }
    Some(record)
}

fn apply_measurement(record: &mut BenchmarkRecord, quantity: &str, unit: &str) {
    let parsed = quantity
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0);
    let Some(value) = parsed else {
        debug!(name = %record.name, quantity, unit, "skipping malformed measurement");
        return;
    };
    match unit {
        "ns/op" => record.ns_per_op = value,
        "B/op" => record.alloced_bytes_per_op = value.trunc() as u64,
        "allocs/op" => record.allocs_per_op = value.trunc() as u64,
        _ => {}
    }
}
