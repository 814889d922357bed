//! Resumable, chunked, parallel downloads of large public datasets.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable configuration and types
//! - `core` - Pure chunk planning, retry state and response validation
//! - `effects` - HTTP, the recovery ledger and the download stages
//!
//! # Key Features
//!
//! - **Positional writes**: chunks land at their offset, in any order
//! - **Recovery ledger**: a chunk is recorded only after its bytes are
//!   flushed, so a restart never skips missing data
//! - **Bounded workers**: exactly `parallel` requests in flight at most
//! - **Whole-file fallback**: servers that ignore `Range` are fetched with
//!   one plain GET instead of being chunked

mod core;
pub mod data;
mod effects;
mod error;

pub use self::core::{
    Chunk, ChunkState, ChunkTask, check_body_length, interleave, parse_content_range, plan_chunks,
    range_header, retry_delay, validate_ranged_status,
};
pub use data::{DownloadOptions, Progress, ProgressCallback, RemoteFile, Source, TransferMode};
pub use effects::{
    BoxStream, Catalog, ChunkedDownloader, DirectoryListingCatalog, HttpClient, HttpResponse,
    LEDGER_DIR, Ledger, MetaStore, RecoveryRecord, RemoteMetadata, ReportFormat, UrlListCatalog,
    download, download_whole_files, format_line, list_sources, list_urls, probe, probe_sizes,
    read_body, resolve, skip_recovered,
};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;

pub use error::{Error, LedgerError, ProbeFailure, Result, TransferError};
