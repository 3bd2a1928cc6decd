use anyhow::Result;
use bench_uploader::config::Cli;
use bench_uploader::run;
use clap::{CommandFactory, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = cli.metadata().validate() {
        eprintln!("{e}");
        // Usage goes to stderr alongside the diagnostic.
        eprintln!("{}", Cli::command().render_help());
        std::process::exit(1);
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling in-flight requests");
            on_signal.cancel();
        }
    });

    let set = run::read_report(&cli).await?;
    let summary = run::publish(&cli, &set, &cancel).await?;
    info!(
        descriptors_created = summary.descriptors_created,
        points = summary.points_written,
        "upload complete"
    );

    println!("Done writing time series data.");
    Ok(())
}
