//! Chunked download engine.
//!
//! Files are split into byte ranges, every pending range of every file goes
//! into one queue, and exactly `parallel` workers drain it; a worker that
//! finds the queue empty exits. Each worker
//! fetches a range, writes it at its offset in the destination, flushes,
//! and only then records it in the [`Ledger`]. Correctness depends on
//! positional writes alone, never on the order chunks complete in.

use std::collections::VecDeque;
use std::fs::File;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::core::{
    Chunk, ChunkState, ChunkTask, interleave, plan_chunks, range_header, retry_delay,
    validate_ranged_status,
};
use crate::data::{DownloadOptions, Progress, RemoteFile};
use crate::effects::http::{HttpClient, read_body};
use crate::effects::ledger::Ledger;
use crate::effects::positional::{prepare_destination, write_at};
use crate::error::{Error, ProbeFailure, Result, TransferError};

/// Downloads range-capable files in parallel chunks, resuming from the ledger.
pub struct ChunkedDownloader<C> {
    client:  Arc<C>,
    ledger:  Arc<Ledger>,
    options: DownloadOptions,
}

impl<C: HttpClient + 'static> ChunkedDownloader<C> {
    pub fn new(client: Arc<C>, ledger: Arc<Ledger>, options: DownloadOptions) -> Self {
        Self {
            client,
            ledger,
            options,
        }
    }

    /// Download every file, which must already be probed.
    ///
    /// Succeeds only when every chunk of every file is on disk. Otherwise
    /// returns the first terminal chunk failure; chunks other workers had
    /// in flight at that moment still finish and are recorded.
    pub async fn download(&self, files: &[RemoteFile]) -> Result<()> {
        self.options.validate()?;

        let mut slots = Vec::with_capacity(files.len());
        let mut per_file = Vec::with_capacity(files.len());
        for (index, file) in files.iter().enumerate() {
            let (slot, pending) = self.plan_file(index, file).await?;
            slots.push(slot);
            per_file.push(pending);
        }

        let queue: VecDeque<QueuedChunk> = interleave(per_file)
            .into_iter()
            .filter_map(|chunk| {
                let slot = slots[chunk.file].clone()?;
                Some(QueuedChunk { slot, chunk })
            })
            .collect();
        if queue.is_empty() {
            debug!("nothing to download");
            return Ok(());
        }

        let workers = self.options.parallel;
        info!(chunks = queue.len(), workers, "starting chunked download");

        let job = Arc::new(Job {
            client: self.client.clone(),
            ledger: self.ledger.clone(),
            options: self.options.clone(),
            queue: Mutex::new(queue),
            halted: AtomicBool::new(false),
            failure: Mutex::new(None),
        });

        let mut set = JoinSet::new();
        for id in 0..workers {
            set.spawn(job.clone().run_worker(id));
        }
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined
                && e.is_panic()
            {
                std::panic::resume_unwind(e.into_panic());
            }
        }

        match job.take_failure() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Work out which chunks of a file are still missing and open its
    /// destination if there are any.
    async fn plan_file(
        &self,
        index: usize,
        file: &RemoteFile,
    ) -> Result<(Option<Arc<FileSlot>>, Vec<Chunk>)> {
        let Some(size) = file.size else {
            return Err(Error::Probe {
                url:    file.url.clone(),
                reason: ProbeFailure::MissingLength,
            });
        };

        if self.ledger.has_progress(&file.url) && !destination_matches(file, size) {
            warn!(url = %file.url, path = %file.destination.display(), "destination missing or resized, discarding recorded progress");
            if let Err(e) = self.ledger.forget(&file.url).await {
                warn!(url = %file.url, error = %e, "failed to clear recovery record");
            }
        }

        if self.ledger.is_file_done(&file.url) {
            debug!(url = %file.url, "already downloaded");
            return Ok((None, Vec::new()));
        }

        let chunks = plan_chunks(index, size, self.options.chunk_size);
        let (done, pending): (Vec<Chunk>, Vec<Chunk>) = chunks
            .into_iter()
            .partition(|c| self.ledger.is_done(&file.url, c.start));
        let recovered: u64 = done.iter().map(Chunk::len).sum();

        let handle = prepare_destination(&file.destination, size).map_err(|source| Error::Destination {
            path: file.destination.clone(),
            source,
        })?;

        if pending.is_empty() {
            self.complete_file(&file.url).await;
            return Ok((None, pending));
        }

        info!(url = %file.url, size, pending = pending.len(), recovered, "queued");
        self.options.notify(Progress::FileStarted {
            url:             file.url.clone(),
            total_bytes:     Some(size),
            recovered_bytes: recovered,
        });

        let slot = Arc::new(FileSlot {
            url:       file.url.clone(),
            handle:    Arc::new(handle),
            remaining: AtomicUsize::new(pending.len()),
        });
        Ok((Some(slot), pending))
    }

    async fn complete_file(&self, url: &str) {
        if let Err(e) = self.ledger.mark_file_done(url).await {
            warn!(%url, error = %e, "failed to record completed file");
        }
        self.options.notify(Progress::FileDone { url: url.to_string() });
    }
}

fn destination_matches(file: &RemoteFile, size: u64) -> bool {
    std::fs::metadata(&file.destination).is_ok_and(|meta| meta.is_file() && meta.len() == size)
}

struct FileSlot {
    url:       String,
    handle:    Arc<File>,
    remaining: AtomicUsize,
}

struct QueuedChunk {
    slot:  Arc<FileSlot>,
    chunk: Chunk,
}

struct Job<C> {
    client:  Arc<C>,
    ledger:  Arc<Ledger>,
    options: DownloadOptions,
    queue:   Mutex<VecDeque<QueuedChunk>>,
    halted:  AtomicBool,
    failure: Mutex<Option<Error>>,
}

impl<C: HttpClient + 'static> Job<C> {
    async fn run_worker(self: Arc<Self>, id: usize) {
        while !self.halted.load(Ordering::SeqCst) {
            let Some(QueuedChunk { slot, chunk }) = self.next_chunk() else {
                break;
            };
            let mut task = ChunkTask::new(chunk, self.options.retries);
            if let Err(err) = self.drive(&slot, &mut task).await {
                warn!(worker = id, error = %err, "chunk failed, stopping download");
                self.halt(err);
                break;
            }
        }
        debug!(worker = id, "worker finished");
    }

    fn next_chunk(&self) -> Option<QueuedChunk> {
        self.queue.lock().unwrap_or_else(|p| p.into_inner()).pop_front()
    }

    /// Run one chunk through its attempts until it is done or terminally failed.
    async fn drive(&self, slot: &FileSlot, task: &mut ChunkTask) -> Result<()> {
        let chunk = task.chunk;
        loop {
            task.begin();
            let err = match self.fetch(slot, &chunk).await {
                Ok(()) => {
                    task.succeed();
                    self.record(slot, &chunk).await;
                    return Ok(());
                }
                Err(err) => err,
            };

            match task.fail(err.is_retryable()) {
                ChunkState::Pending { failures } => {
                    warn!(url = %slot.url, start = chunk.start, failures, error = %err, "retrying chunk");
                    self.options.notify(Progress::ChunkRetry {
                        url:     slot.url.clone(),
                        start:   chunk.start,
                        attempt: failures + 1,
                    });
                    if self.halted.load(Ordering::SeqCst) {
                        return Ok(());
                    }
                    let delay = retry_delay(failures - 1, self.options.retry_backoff, self.options.max_backoff);
                    tokio::time::sleep(delay).await;
                    // Another worker may have failed while this one slept.
                    if self.halted.load(Ordering::SeqCst) {
                        return Ok(());
                    }
                }
                _ => return Err(terminal_error(&slot.url, task, err)),
            }
        }
    }

    async fn fetch(&self, slot: &FileSlot, chunk: &Chunk) -> std::result::Result<(), TransferError> {
        let range = range_header(chunk);
        let response = self
            .client
            .get(&slot.url, Some(range.as_str()))
            .await
            .map_err(|e| TransferError::Transport(e.to_string()))?;
        validate_ranged_status(response.status, response.content_range.as_deref(), chunk)?;

        let body = read_body(response.body, chunk.len()).await?;
        write_at(slot.handle.clone(), chunk.start, body)
            .await
            .map_err(TransferError::Write)
    }

    async fn record(&self, slot: &FileSlot, chunk: &Chunk) {
        debug!(url = %slot.url, start = chunk.start, end = chunk.end, "chunk done");
        if let Err(e) = self.ledger.mark_done(&slot.url, chunk).await {
            warn!(url = %slot.url, start = chunk.start, error = %e, "failed to record chunk");
        }
        self.options.notify(Progress::BytesWritten {
            url:   slot.url.clone(),
            bytes: chunk.len(),
        });

        if slot.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            info!(url = %slot.url, "file complete");
            if let Err(e) = self.ledger.mark_file_done(&slot.url).await {
                warn!(url = %slot.url, error = %e, "failed to record completed file");
            }
            self.options.notify(Progress::FileDone { url: slot.url.clone() });
        }
    }

    /// Stop handing out chunks. Only the first failure is kept.
    fn halt(&self, err: Error) {
        self.halted.store(true, Ordering::SeqCst);
        let mut failure = self.failure.lock().unwrap_or_else(|p| p.into_inner());
        if failure.is_none() {
            *failure = Some(err);
        }
    }

    fn take_failure(&self) -> Option<Error> {
        self.failure.lock().unwrap_or_else(|p| p.into_inner()).take()
    }
}

fn terminal_error(url: &str, task: &ChunkTask, err: TransferError) -> Error {
    let Chunk { start, end, .. } = task.chunk;
    match err {
        TransferError::RangeIgnored => Error::RangeIgnored {
            url: url.to_string(),
            start,
            end,
        },
        last => Error::ChunkExhausted {
            url: url.to_string(),
            start,
            end,
            attempts: task.attempts(),
            last,
        },
    }
}
