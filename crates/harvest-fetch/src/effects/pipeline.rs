//! End-to-end runs: catalog, probe, then whole-file or chunked download.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::data::{DownloadOptions, RemoteFile, Source, TransferMode};
use crate::effects::catalog::Catalog;
use crate::effects::engine::ChunkedDownloader;
use crate::effects::http::HttpClient;
use crate::effects::ledger::Ledger;
use crate::effects::lister::{MetaStore, ReportFormat, list_urls};
use crate::effects::probe::{probe, probe_sizes, skip_recovered};
use crate::effects::whole_file::download_whole_files;
use crate::error::Result;

/// Download every file of every source into `options.directory`.
///
/// Whole-file sources go first, one file at a time. Files of chunked
/// sources are then probed together; those whose server does not
/// advertise byte ranges fall back to whole-file downloads and the rest go
/// through the chunked engine. The recovery ledger is opened for the run
/// and flushed on every exit path.
pub async fn download<C, K>(
    client: Arc<C>,
    catalog: &K,
    sources: &[Source],
    options: DownloadOptions,
) -> Result<()>
where
    C: HttpClient + 'static,
    K: Catalog,
{
    options.validate()?;
    let ledger = Arc::new(Ledger::open(&options.directory, options.chunk_size, options.restart)?);

    let result = run(client, catalog, sources, &options, &ledger).await;

    if let Ok(ledger) = Arc::try_unwrap(ledger)
        && let Err(e) = ledger.close().await
    {
        warn!(error = %e, "failed to close recovery ledger");
    }
    result
}

async fn run<C, K>(
    client: Arc<C>,
    catalog: &K,
    sources: &[Source],
    options: &DownloadOptions,
    ledger: &Arc<Ledger>,
) -> Result<()>
where
    C: HttpClient + 'static,
    K: Catalog,
{
    for source in sources.iter().filter(|s| s.mode == TransferMode::WholeFile) {
        info!(source = %source.name, "downloading files from whole-file source");
        let files = catalog.files(client.as_ref(), source, &options.directory).await?;
        let files = if options.skip { skip_recovered(files, ledger) } else { files };
        download_whole_files(client.as_ref(), ledger, &files, options).await?;
    }

    let mut files = Vec::new();
    for source in sources.iter().filter(|s| s.mode == TransferMode::Chunked) {
        info!(source = %source.name, "gathering files from chunked source");
        files.extend(catalog.files(client.as_ref(), source, &options.directory).await?);
    }
    if files.is_empty() {
        return Ok(());
    }

    let files = probe(client.as_ref(), files, ledger, options.skip).await?;
    let (ranged, whole): (Vec<RemoteFile>, Vec<RemoteFile>) =
        files.into_iter().partition(|f| f.supports_range);

    if !whole.is_empty() {
        warn!(files = whole.len(), "server does not advertise byte ranges, downloading those files whole");
        download_whole_files(client.as_ref(), ledger, &whole, options).await?;
    }

    ChunkedDownloader::new(client, ledger.clone(), options.clone())
        .download(&ranged)
        .await
}

/// Write the URLs of every source to `out`, with sizes in TSV format.
pub async fn list_sources<C, K, W, S>(
    client: &C,
    catalog: &K,
    sources: &[Source],
    directory: &Path,
    format: ReportFormat,
    out: &mut W,
    store: Option<&S>,
) -> Result<()>
where
    C: HttpClient,
    K: Catalog,
    W: Write,
    S: MetaStore,
{
    for source in sources {
        let files = catalog.files(client, source, directory).await?;
        let files = match format {
            ReportFormat::Tsv => probe_sizes(client, files).await?,
            ReportFormat::Plain => files,
        };
        list_urls(out, store, &files, format)?;
    }
    Ok(())
}
