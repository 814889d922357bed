//! URL reports: plain lists or size-annotated TSV, optionally persisted.

use std::io::Write;

use crate::data::RemoteFile;
use crate::error::{Error, Result};

/// Key/value persistence for discovered URLs.
pub trait MetaStore {
    type Error: std::fmt::Display;

    fn save(&self, key: &str, value: &str) -> std::result::Result<(), Self::Error>;
}

impl MetaStore for sled::Db {
    type Error = sled::Error;

    fn save(&self, key: &str, value: &str) -> std::result::Result<(), Self::Error> {
        self.insert(key.as_bytes(), value.as_bytes())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// One URL per line.
    #[default]
    Plain,
    /// `url<TAB>size` per line; the size is empty when unknown.
    Tsv,
}

pub fn format_line(file: &RemoteFile, format: ReportFormat) -> String {
    match format {
        ReportFormat::Plain => file.url.clone(),
        ReportFormat::Tsv => format!(
            "{}\t{}",
            file.url,
            file.size.map(|s| s.to_string()).unwrap_or_default()
        ),
    }
}

/// Write one line per file to `out` and, when a store is given, save each
/// URL with its size (empty when unknown) as the value.
pub fn list_urls<W: Write, S: MetaStore>(
    out: &mut W,
    store: Option<&S>,
    files: &[RemoteFile],
    format: ReportFormat,
) -> Result<()> {
    for file in files {
        writeln!(out, "{}", format_line(file, format)).map_err(Error::Report)?;
        if let Some(store) = store {
            let value = file.size.map(|s| s.to_string()).unwrap_or_default();
            store.save(&file.url, &value).map_err(|e| Error::MetaStore {
                key:    file.url.clone(),
                reason: e.to_string(),
            })?;
        }
    }
    out.flush().map_err(Error::Report)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        saved: RefCell<Vec<(String, String)>>,
    }

    impl MetaStore for MemoryStore {
        type Error = std::convert::Infallible;

        fn save(&self, key: &str, value: &str) -> std::result::Result<(), Self::Error> {
            self.saved.borrow_mut().push((key.to_string(), value.to_string()));
            Ok(())
        }
    }

    struct FailingStore;

    impl MetaStore for FailingStore {
        type Error = &'static str;

        fn save(&self, _: &str, _: &str) -> std::result::Result<(), Self::Error> { Err("database offline") }
    }

    fn files() -> Vec<RemoteFile> {
        vec![
            RemoteFile::new("https://a.gov/x.zip", "x.zip").probed(1024, true),
            RemoteFile::new("https://a.gov/y.zip", "y.zip"),
        ]
    }

    #[test]
    fn plain_report_lists_urls() {
        let mut out = Vec::new();
        list_urls::<_, MemoryStore>(&mut out, None, &files(), ReportFormat::Plain).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "https://a.gov/x.zip\nhttps://a.gov/y.zip\n");
    }

    #[test]
    fn tsv_report_adds_sizes() {
        let mut out = Vec::new();
        list_urls::<_, MemoryStore>(&mut out, None, &files(), ReportFormat::Tsv).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "https://a.gov/x.zip\t1024\nhttps://a.gov/y.zip\t\n"
        );
    }

    #[test]
    fn store_receives_every_url() {
        let store = MemoryStore::default();
        list_urls(&mut std::io::sink(), Some(&store), &files(), ReportFormat::Plain).unwrap();
        assert_eq!(store.saved.into_inner(), vec![
            ("https://a.gov/x.zip".to_string(), "1024".to_string()),
            ("https://a.gov/y.zip".to_string(), String::new()),
        ]);
    }

    #[test]
    fn store_failure_names_the_key() {
        let err = list_urls(&mut std::io::sink(), Some(&FailingStore), &files(), ReportFormat::Plain)
            .unwrap_err();
        assert!(matches!(err, Error::MetaStore { ref key, .. } if key == "https://a.gov/x.zip"));
    }

    #[test]
    fn sled_store_persists_values() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("meta")).unwrap();
        list_urls(&mut std::io::sink(), Some(&db), &files(), ReportFormat::Tsv).unwrap();
        assert_eq!(db.get("https://a.gov/x.zip").unwrap().as_deref(), Some(&b"1024"[..]));
    }
}
