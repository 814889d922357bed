//! I/O: HTTP, the recovery ledger, destination files and the download stages.

mod catalog;
mod engine;
mod http;
mod ledger;
mod lister;
mod pipeline;
mod positional;
mod probe;
mod whole_file;

pub use catalog::{Catalog, DirectoryListingCatalog, UrlListCatalog, resolve};
pub use engine::ChunkedDownloader;
pub use http::{BoxStream, HttpClient, HttpResponse, RemoteMetadata, read_body};
#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
pub use ledger::{LEDGER_DIR, Ledger, RecoveryRecord};
pub use lister::{MetaStore, ReportFormat, format_line, list_urls};
pub use pipeline::{download, list_sources};
pub use probe::{probe, probe_sizes, skip_recovered};
pub use whole_file::download_whole_files;
