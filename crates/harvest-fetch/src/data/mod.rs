//! Immutable data types shared by every stage of a download run.
//!
//! Nothing here performs I/O: remote file descriptions, source definitions,
//! run options and progress events are plain values passed between the
//! pure planning code in [`crate::core`] and the effects in
//! [`crate::effects`].

pub mod options;
pub mod progress;
pub mod remote;

pub use options::{DownloadOptions, ProgressCallback};
pub use progress::Progress;
pub use remote::{RemoteFile, Source, TransferMode, file_name_from_url};
