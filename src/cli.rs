//! Command-line interface for autosort.
//!
//! This module handles:
//! - Argument parsing
//! - Building the sorter from configuration
//! - The watch lifecycle: start, wait for Ctrl+C or a fatal error, stop

use crate::config::Config;
use crate::file_organizer::FileSorter;
use crate::output::OutputFormatter;
use crate::watcher::{DirectoryWatcher, Subscription};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// Background file sorter: moves newly created files into category folders.
#[derive(Debug, Parser)]
#[command(name = "autosort")]
pub struct Cli {
    /// Target directory to watch for file creations.
    pub directory: PathBuf,
}

/// Builds the sorter for `directory` from configuration.
pub fn build_sorter(directory: PathBuf, config: &Config) -> Result<FileSorter> {
    let filters = config
        .filters
        .compile()
        .context("Error compiling filters")?;

    Ok(FileSorter::new(directory)
        .with_filters(filters)
        .with_failure_policy(config.sorter.on_error))
}

/// Watches the directory until Ctrl+C.
///
/// Returns an error if the directory cannot be watched, or if the watch loop
/// ends on its own because of a fatal failure.
pub async fn run(cli: Cli, config: &Config) -> Result<()> {
    run_until(cli, config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("[cli] cannot listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Watches the directory until `shutdown` resolves.
pub async fn run_until<F>(cli: Cli, config: &Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let sorter = build_sorter(cli.directory, config)?;
    let root = sorter.target_root().to_path_buf();

    let mut subscription = DirectoryWatcher::start(&root, sorter)
        .with_context(|| format!("Cannot watch directory {}", root.display()))?;

    OutputFormatter::info(&format!(
        "Watching {} for new files. Press Ctrl+C to stop.",
        root.display()
    ));

    tokio::select! {
        _ = shutdown => {
            tracing::info!("[cli] interrupt received, stopping watcher");
        }
        _ = subscription.stopped() => {
            OutputFormatter::warning("Watcher stopped unexpectedly.");
        }
    }

    shutdown_watcher(&mut subscription).await
}

async fn shutdown_watcher(subscription: &mut Subscription) -> Result<()> {
    subscription.stop();
    subscription
        .wait()
        .await
        .with_context(|| format!("Watching {} failed", subscription.path().display()))?;
    OutputFormatter::info("Stopped.");
    Ok(())
}
