use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::cli::download::DownloadArg;
use crate::cli::urls::UrlsArg;
use crate::logging::Verbosity;

#[derive(Clone, Debug, Parser)]
#[command(name = "harvest", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    #[command(subcommand)]
    pub cmd: Commands,

    /// Only log warnings and errors
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log every chunk
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "dl", name = "download", about = "Download every file the sources publish")]
    Download(DownloadArg),
    #[command(alias = "ls", name = "urls", about = "Print the URLs the sources publish")]
    Urls(UrlsArg),
}

impl App {
    pub fn verbosity(&self) -> Verbosity {
        match (self.quiet, self.verbose) {
            (true, _) => Verbosity::Quiet,
            (_, true) => Verbosity::Debug,
            _ => Verbosity::Normal,
        }
    }

    pub async fn run(self) -> Result<()> {
        match self.cmd {
            Commands::Download(arg) => arg.run().await,
            Commands::Urls(arg) => arg.run().await,
        }
    }
}
