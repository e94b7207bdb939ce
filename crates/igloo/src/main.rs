use anyhow::Context;
use clap::Parser;
use igloo::config::Settings;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file; falls back to IGLOO_SPLIT_READER_CONFIG_PATH.
    #[arg(short, long)]
    config: Option<String>,

    /// Number of in-memory splits to read.
    #[arg(long)]
    splits: Option<usize>,

    /// Records held by each split.
    #[arg(long)]
    records: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut settings = Settings::new(args.config.as_deref()).context("Failed to load settings")?;
    if let Some(splits) = args.splits {
        settings.num_splits = splits;
    }
    if let Some(records) = args.records {
        settings.records_per_split = records;
    }

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let summary = igloo::run(&settings, async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;

    info!(
        fetches = summary.fetches,
        records = summary.records,
        finished_splits = summary.finished_splits.len(),
        interrupted = summary.interrupted,
        "split reader drained"
    );
    Ok(())
}
