mod cli;
mod error;
mod geo;
mod logging;
mod mapview;
mod model;
mod orchestrator;
mod position;
mod service;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::{Context, Result};
use clap::Parser;

// The controller keeps its state on one task, so one thread is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let log_dir = args.log_dir.clone().unwrap_or_else(logging::default_log_dir);
    let _log_guard = logging::init_logging(&log_dir, args.is_headless())
        .with_context(|| format!("initialize logging in {}", log_dir.display()))?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), base_url = %args.base_url, "starting");

    cli::run(args).await
}
