use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use harvest_fetch::{ReportFormat, ReqwestClient, list_sources};

use crate::cli::source::SourceArgs;

#[derive(Args, Clone, Debug)]
pub struct UrlsArg {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Print `url<TAB>size`, probing each file for its size
    #[arg(long)]
    pub tsv: bool,

    /// Also save every URL and its size to a sled database at this path
    #[arg(long, value_name = "PATH")]
    pub save_to_db: Option<PathBuf>,

    /// Per-request timeout, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    pub timeout: u64,
}

impl UrlsArg {
    pub fn format(&self) -> ReportFormat {
        if self.tsv { ReportFormat::Tsv } else { ReportFormat::Plain }
    }

    pub async fn run(self) -> Result<()> {
        let sources = self.sources.sources()?;
        let catalog = self.sources.catalog();
        let client = ReqwestClient::new(Duration::from_secs(self.timeout)).context("failed to build HTTP client")?;

        let store = self
            .save_to_db
            .as_ref()
            .map(|path| sled::open(path).with_context(|| format!("failed to open {}", path.display())))
            .transpose()?;

        let mut out = std::io::stdout().lock();
        list_sources(
            &client,
            &catalog,
            &sources,
            &std::env::current_dir().context("failed to read current directory")?,
            self.format(),
            &mut out,
            store.as_ref(),
        )
        .await
        .context("listing URLs failed")?;

        if let Some(store) = store {
            store.flush_async().await.context("failed to flush URL database")?;
        }
        Ok(())
    }
}
