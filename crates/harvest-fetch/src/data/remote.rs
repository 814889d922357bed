use std::path::{Path, PathBuf};

/// A file offered by a source.
///
/// `size` and `supports_range` are unknown until the prober has seen the
/// file; after that the value is not modified again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub url:            String,
    pub destination:    PathBuf,
    pub size:           Option<u64>,
    pub supports_range: bool,
}

impl RemoteFile {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url:            url.into(),
            destination:    destination.into(),
            size:           None,
            supports_range: false,
        }
    }

    /// A file saved under `directory`, named after the last segment of its URL.
    pub fn in_directory(url: impl Into<String>, directory: &Path) -> Self {
        let url = url.into();
        let destination = directory.join(file_name_from_url(&url));
        Self::new(url, destination)
    }

    pub fn probed(self, size: u64, supports_range: bool) -> Self {
        Self {
            size: Some(size),
            supports_range,
            ..self
        }
    }
}

/// How files of a source must be transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    /// Byte ranges fetched in parallel, resumable through the ledger.
    #[default]
    Chunked,

    /// One plain GET per file. For servers that advertise range support
    /// but always answer with the full body.
    WholeFile,
}

/// A place datasets are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name:     String,
    pub base_url: String,
    pub mode:     TransferMode,
}

impl Source {
    pub fn chunked(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name:     name.into(),
            base_url: base_url.into(),
            mode:     TransferMode::Chunked,
        }
    }

    pub fn whole_file(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name:     name.into(),
            base_url: base_url.into(),
            mode:     TransferMode::WholeFile,
        }
    }
}

/// Last path segment of `url`, without query or fragment.
///
/// Falls back to `index` when the path ends in a slash.
pub fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    match path.split_once('/') {
        Some((_, tail)) => match tail.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "index".to_string(),
        },
        None => "index".to_string(),
    }
}
