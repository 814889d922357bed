//! Error types for harvest-fetch.
//!
//! Fatal errors name the stage that failed and the resource it failed on.
//! [`TransferError`] is the per-attempt failure that the engine retries
//! locally; it only surfaces wrapped in [`Error::ChunkExhausted`] or
//! [`Error::WholeFile`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("catalog for {source_name} unreachable: {reason}")]
    Discovery { source_name: String, reason: String },

    #[error("probing {url} failed: {reason}")]
    Probe { url: String, reason: ProbeFailure },

    #[error("chunk {start}..{end} of {url} failed after {attempts} attempts: {last}")]
    ChunkExhausted {
        url:      String,
        start:    u64,
        end:      u64,
        attempts: u32,
        #[source]
        last:     TransferError,
    },

    #[error("{url} answered the range request for {start}..{end} with the full body")]
    RangeIgnored { url: String, start: u64, end: u64 },

    #[error("downloading {url} failed: {cause}")]
    WholeFile {
        url:   String,
        #[source]
        cause: TransferError,
    },

    #[error("cannot prepare {path}: {source}")]
    Destination {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("writing URL report failed: {0}")]
    Report(#[source] io::Error),

    #[error("saving {key} failed: {reason}")]
    MetaStore { key: String, reason: String },

    #[error("recovery ledger unavailable: {0}")]
    Ledger(#[from] LedgerError),

    #[error("invalid options: {0}")]
    InvalidOptions(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("request failed: {0}")]
    Request(String),

    #[error("server answered HTTP {0}")]
    Status(u16),

    #[error("no Content-Length in response")]
    MissingLength,
}

/// Failure of a single transfer attempt.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server answered HTTP {0}")]
    Status(u16),

    #[error("server ignored the Range header")]
    RangeIgnored,

    #[error("Content-Range mismatch: expected {expected}, got {actual:?}")]
    ContentRange { expected: String, actual: Option<String> },

    #[error("body length mismatch: expected {expected} bytes, got {actual}")]
    BodyLength { expected: u64, actual: u64 },

    #[error("write failed: {0}")]
    Write(#[source] io::Error),
}

impl TransferError {
    /// Whether trying the same request again can succeed.
    pub fn is_retryable(&self) -> bool { !matches!(self, TransferError::RangeIgnored) }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("record encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    #[error("ledger directory error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
