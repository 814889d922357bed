//! Sequential whole-body downloads for servers that ignore `Range`.
//!
//! Chunking against such a server would fetch the entire body once per
//! chunk, so these files take one plain GET each. There is no chunk
//! bookkeeping and no resume: an interrupted file starts again from byte 0.
//! A file's old record is cleared before its destination is truncated, so
//! a failed transfer never leaves a "complete" mark over a partial file.

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::data::{DownloadOptions, Progress, RemoteFile};
use crate::effects::http::HttpClient;
use crate::effects::ledger::Ledger;
use crate::error::{Error, Result, TransferError};

/// Download each file in turn with a single full-body GET.
pub async fn download_whole_files<C: HttpClient>(
    client: &C,
    ledger: &Ledger,
    files: &[RemoteFile],
    options: &DownloadOptions,
) -> Result<()> {
    for file in files {
        info!(url = %file.url, path = %file.destination.display(), "downloading whole file");
        options.notify(Progress::FileStarted {
            url:             file.url.clone(),
            total_bytes:     file.size,
            recovered_bytes: 0,
        });

        if ledger.has_progress(&file.url) {
            ledger.forget(&file.url).await?;
        }
        fetch_whole(client, file, options).await?;

        if let Err(e) = ledger.mark_whole_file_done(&file.url).await {
            warn!(url = %file.url, error = %e, "failed to record completed file");
        }
        options.notify(Progress::FileDone { url: file.url.clone() });
    }
    Ok(())
}

async fn fetch_whole<C: HttpClient>(client: &C, file: &RemoteFile, options: &DownloadOptions) -> Result<()> {
    let wrap = |cause: TransferError| Error::WholeFile {
        url: file.url.clone(),
        cause,
    };

    let response = client
        .get(&file.url, None)
        .await
        .map_err(|e| wrap(TransferError::Transport(e.to_string())))?;
    if !response.is_success() {
        return Err(wrap(TransferError::Status(response.status)));
    }

    if let Some(parent) = file.destination.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|source| Error::Destination {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let mut out = tokio::fs::File::create(&file.destination)
        .await
        .map_err(|source| Error::Destination {
            path: file.destination.clone(),
            source,
        })?;

    let mut body = response.body;
    let mut written = 0u64;
    while let Some(piece) = body.next().await {
        let piece = piece.map_err(|e| wrap(TransferError::Transport(e.to_string())))?;
        out.write_all(&piece)
            .await
            .map_err(|e| wrap(TransferError::Write(e)))?;
        written += piece.len() as u64;
        options.notify(Progress::BytesWritten {
            url:   file.url.clone(),
            bytes: piece.len() as u64,
        });
    }
    out.sync_all().await.map_err(|e| wrap(TransferError::Write(e)))?;

    if let Some(expected) = file.size
        && expected != written
    {
        return Err(wrap(TransferError::BodyLength {
            expected,
            actual: written,
        }));
    }
    Ok(())
}
