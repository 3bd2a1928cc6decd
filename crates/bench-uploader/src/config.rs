use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use reporter::{RunMetadata, StackdriverConfig};

/// Publish Go benchmark results read from stdin as Cloud Monitoring time series.
#[derive(Debug, Clone, Parser)]
#[command(name = "bench-uploader", disable_version_flag = true)]
pub struct Cli {
    /// Google Project ID
    #[arg(short = 'p', long = "projectID", alias = "project-id", default_value = "")]
    pub project_id: String,

    /// Git Branch
    #[arg(short = 'b', long, default_value = "")]
    pub branch: String,

    /// Git Hash
    #[arg(short = 'g', long, default_value = "")]
    pub githash: String,

    /// Release Version
    #[arg(short = 'v', long, default_value = "")]
    pub version: String,

    /// Monitoring API root (defaults to $MONITORING_ENDPOINT or the public endpoint)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Deadline for each descriptor lookup or creation, in seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub call_timeout_secs: u64,

    /// Read the benchmark report from a file instead of stdin
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Reconcile and write against an in-memory backend; nothing leaves the process
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    pub fn metadata(&self) -> RunMetadata {
        RunMetadata::new(self.project_id.trim())
            .with_branch(&self.branch)
            .with_githash(&self.githash)
            .with_version(&self.version)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Backend settings from the environment, with CLI overrides applied.
    pub fn backend_config(&self) -> StackdriverConfig {
        let config = StackdriverConfig::default();
        match &self.endpoint {
            Some(endpoint) => config.with_endpoint(endpoint),
            None => config,
        }
    }
}
