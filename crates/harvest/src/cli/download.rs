use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use harvest_fetch::{DownloadOptions, ReqwestClient, download};
use tracing::info;

use crate::cli::source::SourceArgs;
use crate::ui::tracker::{ProgressTracker, ProgressTrackerConfig, Tracker};

#[derive(Args, Clone, Debug)]
pub struct DownloadArg {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Directory receiving the files and the recovery ledger
    #[arg(long, short, default_value = "data")]
    pub directory: PathBuf,

    /// Per-request timeout, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 15 * 60)]
    pub timeout: u64,

    /// Leave files already recorded as complete out of the run
    #[arg(long)]
    pub skip: bool,

    /// Forget all recorded progress and start over
    #[arg(long)]
    pub restart: bool,

    /// Concurrent range requests
    #[arg(long, short, default_value_t = 16)]
    pub parallel: usize,

    /// Failures tolerated per chunk before the run stops
    #[arg(long, short, default_value_t = 32)]
    pub retries: u32,

    /// Bytes per range request
    #[arg(long, value_name = "BYTES", default_value_t = 8 * 1024 * 1024)]
    pub chunk_size: u64,

    /// Base delay between attempts of a chunk, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub backoff: u64,

    /// Longest delay between attempts of a chunk, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub max_backoff: u64,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl DownloadArg {
    pub fn options(&self) -> DownloadOptions {
        DownloadOptions::new(&self.directory)
            .timeout(Duration::from_secs(self.timeout))
            .skip(self.skip)
            .restart(self.restart)
            .parallel(self.parallel)
            .retries(self.retries)
            .chunk_size(self.chunk_size)
            .retry_backoff(Duration::from_millis(self.backoff))
            .max_backoff(Duration::from_secs(self.max_backoff))
    }

    pub async fn run(self) -> Result<()> {
        let sources = self.sources.sources()?;
        let catalog = self.sources.catalog();
        let options = self.options();
        options.validate().context("invalid download options")?;

        let client = ReqwestClient::new(options.timeout).context("failed to build HTTP client")?;
        let tracker = Arc::new(ProgressTracker::new(ProgressTrackerConfig {
            hidden: self.no_progress,
        }));
        let options = options.on_progress(tracker.callback());

        info!(
            directory = %self.directory.display(),
            sources = sources.len(),
            parallel = self.parallel,
            chunk_size = self.chunk_size,
            "starting download"
        );
        let result = download(Arc::new(client), &catalog, &sources, options).await;
        tracker.finish(None);
        result.with_context(|| format!("download into {} failed", self.directory.display()))?;

        println!(
            "{} every file is in {}",
            style("done:").green().bold(),
            style(self.directory.display()).cyan()
        );
        Ok(())
    }
}
