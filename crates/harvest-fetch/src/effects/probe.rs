//! Size probing: learn each file's length and range support before planning.

use tracing::{debug, info};

use crate::data::RemoteFile;
use crate::effects::http::HttpClient;
use crate::effects::ledger::Ledger;
use crate::error::{Error, ProbeFailure, Result};

/// Remove files the ledger records as complete.
pub fn skip_recovered(files: Vec<RemoteFile>, ledger: &Ledger) -> Vec<RemoteFile> {
    let before = files.len();
    let files: Vec<_> = files.into_iter().filter(|f| !ledger.is_file_done(&f.url)).collect();
    if files.len() < before {
        info!(skipped = before - files.len(), "skipping files already downloaded");
    }
    files
}

/// HEAD every file and fill in its size and range support.
///
/// One failure fails the whole batch.
pub async fn probe_sizes<C: HttpClient>(client: &C, files: Vec<RemoteFile>) -> Result<Vec<RemoteFile>> {
    let mut probed = Vec::with_capacity(files.len());
    for file in files {
        let meta = client.head(&file.url).await.map_err(|e| Error::Probe {
            url:    file.url.clone(),
            reason: ProbeFailure::Request(e.to_string()),
        })?;
        if !(200..300).contains(&meta.status) {
            return Err(Error::Probe {
                url:    file.url,
                reason: ProbeFailure::Status(meta.status),
            });
        }
        let Some(size) = meta.content_length else {
            return Err(Error::Probe {
                url:    file.url,
                reason: ProbeFailure::MissingLength,
            });
        };
        debug!(url = %file.url, size, ranges = meta.accepts_ranges, "probed");
        probed.push(file.probed(size, meta.accepts_ranges));
    }
    Ok(probed)
}

/// Probe a batch, first dropping recovered files when `skip` is set so
/// they are never requested at all.
pub async fn probe<C: HttpClient>(
    client: &C,
    files: Vec<RemoteFile>,
    ledger: &Ledger,
    skip: bool,
) -> Result<Vec<RemoteFile>> {
    let files = if skip { skip_recovered(files, ledger) } else { files };
    probe_sizes(client, files).await
}
