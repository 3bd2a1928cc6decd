//! Process-level tests for the `bench-uploader` binary.
//!
//! Only `--dry-run` and configuration failures are exercised here; neither
//! touches the network.

use std::io::Write;
use std::process::{Command, Output, Stdio};

const REPORT: &str = "\
goos: linux
goarch: amd64
BenchmarkEncode-8   \t  500000\t      2410 ns/op\t     256 B/op\t       4 allocs/op
BenchmarkDecode-8   \t 1000000\t     123.4 ns/op\t      56 B/op\t       2 allocs/op
PASS
";

fn run_with_stdin(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_bench-uploader"))
        .args(args)
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("binary should start");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("write report to stdin");
    child.wait_with_output().expect("binary should exit")
}

#[test]
fn missing_project_exits_with_usage() {
    let output = run_with_stdin(&["--dry-run"], REPORT);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("projectID must be set"));
    assert!(stderr.contains("Usage"));
    assert!(output.stdout.is_empty());
}

#[test]
fn dry_run_reports_completion() {
    let output = run_with_stdin(
        &["-p", "bench-project", "-b", "main", "-g", "abc123", "--dry-run"],
        REPORT,
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "Done writing time series data."
    );
}

#[test]
fn missing_credentials_fail_the_run() {
    let output = Command::new(env!("CARGO_BIN_EXE_bench-uploader"))
        .args(["-p", "bench-project", "--endpoint", "http://127.0.0.1:9"])
        .env_remove("GOOGLE_OAUTH_ACCESS_TOKEN")
        .env("RUST_LOG", "off")
        .stdin(Stdio::null())
        .output()
        .expect("binary should run");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to upload benchmarks"));
    assert!(output.stdout.is_empty());
}
