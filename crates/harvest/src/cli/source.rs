use std::path::Path;

use anyhow::{Result, bail};
use clap::Args;
use harvest_fetch::{Catalog, DirectoryListingCatalog, HttpClient, RemoteFile, Source, UrlListCatalog};

/// Where files come from and how they are discovered.
#[derive(Args, Clone, Debug)]
pub struct SourceArgs {
    /// Base URL of a source served in parallel byte ranges
    #[arg(long = "chunked", value_name = "URL")]
    pub chunked: Vec<String>,

    /// Base URL of a source that must be fetched one whole file at a time
    #[arg(long = "whole-file", value_name = "URL")]
    pub whole_file: Vec<String>,

    /// Fetch exactly these files, relative to each base URL, instead of
    /// reading the base URL's directory listing
    #[arg(long = "file", value_name = "NAME")]
    pub files: Vec<String>,

    /// Extensions picked from a directory listing
    #[arg(long = "ext", value_name = "EXT", default_value = "zip")]
    pub extensions: Vec<String>,
}

impl SourceArgs {
    /// Whole-file sources first, then chunked ones, each in the given order.
    pub fn sources(&self) -> Result<Vec<Source>> {
        if self.chunked.is_empty() && self.whole_file.is_empty() {
            bail!("no sources given, pass at least one --chunked or --whole-file URL");
        }
        let whole = self
            .whole_file
            .iter()
            .map(|url| Source::whole_file(source_name(url), url.clone()));
        let chunked = self
            .chunked
            .iter()
            .map(|url| Source::chunked(source_name(url), url.clone()));
        Ok(whole.chain(chunked).collect())
    }

    pub fn catalog(&self) -> SourceCatalog {
        if self.files.is_empty() {
            SourceCatalog::Listing(DirectoryListingCatalog::new(self.extensions.clone()))
        } else {
            SourceCatalog::Fixed(UrlListCatalog::new(self.files.clone()))
        }
    }
}

/// Host and path of a base URL, used in logs and errors.
fn source_name(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.trim_end_matches('/').to_string()
}

pub enum SourceCatalog {
    Fixed(UrlListCatalog),
    Listing(DirectoryListingCatalog),
}

impl Catalog for SourceCatalog {
    async fn files<C: HttpClient>(
        &self,
        client: &C,
        source: &Source,
        directory: &Path,
    ) -> harvest_fetch::Result<Vec<RemoteFile>> {
        match self {
            Self::Fixed(catalog) => catalog.files(client, source, directory).await,
            Self::Listing(catalog) => catalog.files(client, source, directory).await,
        }
    }
}
