use std::collections::VecDeque;

/// A contiguous byte range of one file; the unit of fetch and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// Index of the file in the batch being downloaded.
    pub file:  usize,
    /// Starting byte offset
    pub start: u64,
    /// Ending byte offset (exclusive)
    pub end:   u64,
}

impl Chunk {
    pub fn len(&self) -> u64 { self.end - self.start }

    pub fn is_empty(&self) -> bool { self.start == self.end }
}

/// Split a file of `file_size` bytes into ranges of `chunk_size` bytes.
///
/// The last chunk is shorter when the size is not a multiple of the chunk
/// size. A zero-byte file yields no chunks.
///
/// # Panics
///
/// Panics if `chunk_size` is 0; options are validated before planning.
pub fn plan_chunks(file: usize, file_size: u64, chunk_size: u64) -> Vec<Chunk> {
    assert!(chunk_size > 0, "chunk size must be greater than 0");

    let count = file_size.div_ceil(chunk_size);
    let mut chunks = Vec::with_capacity(count as usize);
    let mut start = 0;
    while start < file_size {
        let end = start.saturating_add(chunk_size).min(file_size);
        chunks.push(Chunk { file, start, end });
        start = end;
    }
    chunks
}

/// Merge per-file chunk lists into one queue, taking one chunk from each
/// file in turn so a large file cannot hold back smaller ones.
pub fn interleave(per_file: Vec<Vec<Chunk>>) -> VecDeque<Chunk> {
    let total = per_file.iter().map(Vec::len).sum();
    let mut queue = VecDeque::with_capacity(total);
    let mut iters: Vec<_> = per_file.into_iter().map(Vec::into_iter).collect();
    while queue.len() < total {
        for iter in &mut iters {
            if let Some(chunk) = iter.next() {
                queue.push_back(chunk);
            }
        }
    }
    queue
}

/// Lifecycle of a chunk within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending { failures: u32 },
    InFlight { failures: u32 },
    Done,
    /// Terminal: the retry bound was exceeded or the failure cannot be retried.
    Failed { failures: u32 },
}

/// A chunk together with its retry bookkeeping.
///
/// `retries` is the number of failures tolerated: a chunk that fails
/// `retries` times may still succeed on its next attempt, and failure
/// number `retries + 1` is terminal.
#[derive(Debug, Clone)]
pub struct ChunkTask {
    pub chunk: Chunk,
    state:     ChunkState,
    retries:   u32,
}

impl ChunkTask {
    pub fn new(chunk: Chunk, retries: u32) -> Self {
        Self {
            chunk,
            state: ChunkState::Pending { failures: 0 },
            retries,
        }
    }

    pub fn state(&self) -> ChunkState { self.state }

    pub fn failures(&self) -> u32 {
        match self.state {
            ChunkState::Pending { failures }
            | ChunkState::InFlight { failures }
            | ChunkState::Failed { failures } => failures,
            ChunkState::Done => 0,
        }
    }

    /// Attempts made so far, counting one in flight.
    pub fn attempts(&self) -> u32 {
        match self.state {
            ChunkState::InFlight { failures } => failures + 1,
            _ => self.failures(),
        }
    }

    /// Pending → InFlight. Returns `false` from any other state.
    pub fn begin(&mut self) -> bool {
        match self.state {
            ChunkState::Pending { failures } => {
                self.state = ChunkState::InFlight { failures };
                true
            }
            _ => false,
        }
    }

    /// InFlight → Done.
    pub fn succeed(&mut self) {
        debug_assert!(matches!(self.state, ChunkState::InFlight { .. }));
        self.state = ChunkState::Done;
    }

    /// InFlight → Pending while the bound allows another attempt, otherwise
    /// InFlight → Failed. Non-retryable failures go straight to Failed.
    pub fn fail(&mut self, retryable: bool) -> ChunkState {
        debug_assert!(matches!(self.state, ChunkState::InFlight { .. }));
        let failures = self.failures() + 1;
        self.state = if retryable && failures <= self.retries {
            ChunkState::Pending { failures }
        } else {
            ChunkState::Failed { failures }
        };
        self.state
    }
}
