use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::progress::Progress;

pub type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;

/// Configuration for a download run.
///
/// # Examples
///
/// ```
/// use harvest_fetch::DownloadOptions;
///
/// let options = DownloadOptions::new("data")
///     .parallel(4)
///     .retries(8)
///     .chunk_size(1 << 20)
///     .skip(true);
/// assert_eq!(options.parallel, 4);
/// ```
#[derive(Clone)]
pub struct DownloadOptions {
    /// Directory receiving the downloaded files and the recovery ledger.
    pub directory: PathBuf,

    /// Per-request timeout applied by the HTTP client.
    ///
    /// Default: 15 minutes
    pub timeout: Duration,

    /// Leave files the ledger records as complete out of the run entirely:
    /// they are neither probed nor downloaded.
    ///
    /// Default: false
    pub skip: bool,

    /// Discard every record in the recovery ledger before starting.
    ///
    /// Default: false
    pub restart: bool,

    /// Number of workers fetching chunks concurrently.
    ///
    /// Default: 16
    pub parallel: usize,

    /// Failures tolerated per chunk. A chunk may fail `retries` times and
    /// still succeed on the next attempt; one more failure ends the run.
    ///
    /// Default: 32
    pub retries: u32,

    /// Bytes requested per range request.
    ///
    /// Default: 8 MiB
    pub chunk_size: u64,

    /// Base delay for exponential backoff between attempts of a chunk.
    ///
    /// Default: 100ms
    pub retry_backoff: Duration,

    /// Longest wait between attempts of a chunk, however many failures
    /// came before.
    ///
    /// Default: 30s
    pub max_backoff: Duration,

    /// Progress callback, invoked from worker tasks.
    ///
    /// Default: None
    pub on_progress: Option<ProgressCallback>,
}

impl fmt::Debug for DownloadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadOptions")
            .field("directory", &self.directory)
            .field("timeout", &self.timeout)
            .field("skip", &self.skip)
            .field("restart", &self.restart)
            .field("parallel", &self.parallel)
            .field("retries", &self.retries)
            .field("chunk_size", &self.chunk_size)
            .field("retry_backoff", &self.retry_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("on_progress", &"{ ... }")
            .finish()
    }
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data"),
            timeout: Duration::from_secs(15 * 60),
            skip: false,
            restart: false,
            parallel: 16,
            retries: 32,
            chunk_size: 8 * 1024 * 1024,
            retry_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            on_progress: None,
        }
    }
}

impl DownloadOptions {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    #[must_use]
    pub fn restart(mut self, restart: bool) -> Self {
        self.restart = restart;
        self
    }

    #[must_use]
    pub fn parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub fn chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    #[must_use]
    pub fn max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    #[must_use]
    pub fn on_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Reject option combinations the engine cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.parallel == 0 {
            return Err(crate::error::Error::InvalidOptions("parallel must be at least 1"));
        }
        if self.chunk_size == 0 {
            return Err(crate::error::Error::InvalidOptions("chunk size must be at least 1 byte"));
        }
        Ok(())
    }

    pub(crate) fn notify(&self, progress: Progress) {
        if let Some(ref callback) = self.on_progress {
            callback(&progress);
        }
    }
}
