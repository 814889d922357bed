/// Events emitted while a run makes progress.
///
/// Events arrive from several workers at once; a callback must not assume
/// any ordering between files, and chunks of one file complete in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// A file has work queued. `total_bytes` is the full file size and
    /// `recovered_bytes` the part already on disk from an earlier run.
    FileStarted {
        url:             String,
        total_bytes:     Option<u64>,
        recovered_bytes: u64,
    },

    /// Bytes landed on disk: a finished chunk, or a streamed body slice on
    /// the whole-file path.
    BytesWritten { url: String, bytes: u64 },

    /// A chunk attempt failed and will be tried again.
    ChunkRetry {
        url:     String,
        start:   u64,
        attempt: u32,
    },

    /// Every byte of the file is on disk.
    FileDone { url: String },
}

impl Progress {
    pub fn url(&self) -> &str {
        match self {
            Progress::FileStarted { url, .. }
            | Progress::BytesWritten { url, .. }
            | Progress::ChunkRetry { url, .. }
            | Progress::FileDone { url } => url,
        }
    }
}
