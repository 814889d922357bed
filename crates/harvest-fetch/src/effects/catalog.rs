//! Discovery of the files a source publishes.

use std::future::Future;
use std::path::Path;

use futures_util::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::data::{RemoteFile, Source};
use crate::effects::http::HttpClient;
use crate::error::{Error, Result};

/// Yields the ordered list of files a source offers.
pub trait Catalog: Send + Sync {
    fn files<C: HttpClient>(
        &self,
        client: &C,
        source: &Source,
        directory: &Path,
    ) -> impl Future<Output = Result<Vec<RemoteFile>>> + Send;
}

/// A fixed list of URLs, absolute or relative to the source's base URL.
///
/// The base URL is taken as a directory whether or not it ends in `/`.
#[derive(Debug, Clone, Default)]
pub struct UrlListCatalog {
    urls: Vec<String>,
}

impl UrlListCatalog {
    pub fn new(urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }
}

impl Catalog for UrlListCatalog {
    async fn files<C: HttpClient>(
        &self,
        _client: &C,
        source: &Source,
        directory: &Path,
    ) -> Result<Vec<RemoteFile>> {
        let base = directory_url(&source.base_url);
        self.urls
            .iter()
            .map(|url| {
                let resolved = resolve(&base, url).map_err(|e| Error::Discovery {
                    source_name: source.name.clone(),
                    reason:      format!("cannot resolve {url} against {base}: {e}"),
                })?;
                Ok(RemoteFile::in_directory(resolved, directory))
            })
            .collect()
    }
}

static HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)href\s*=\s*["']([^"'#?]+)["']"#).expect("valid href pattern"));

/// Files linked from an HTML index page, filtered by extension.
///
/// Links keep their order of appearance; duplicates are dropped.
#[derive(Debug, Clone)]
pub struct DirectoryListingCatalog {
    extensions: Vec<String>,
}

impl DirectoryListingCatalog {
    pub fn new(extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    fn wanted(&self, link: &str) -> bool {
        let link = link.to_ascii_lowercase();
        self.extensions
            .iter()
            .any(|ext| link.rsplit_once('.').is_some_and(|(_, e)| e == ext))
    }

    /// Links in `html` matching the wanted extensions, resolved against the
    /// page URL `base`. Links that do not resolve are skipped.
    pub fn extract(&self, base: &str, html: &str) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        HREF.captures_iter(html)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .filter(|link| self.wanted(link))
            .filter_map(|link| resolve(base, link).ok())
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }
}

impl Catalog for DirectoryListingCatalog {
    async fn files<C: HttpClient>(
        &self,
        client: &C,
        source: &Source,
        directory: &Path,
    ) -> Result<Vec<RemoteFile>> {
        let discovery = |reason: String| Error::Discovery {
            source_name: source.name.clone(),
            reason,
        };

        let response = client
            .get(&source.base_url, None)
            .await
            .map_err(|e| discovery(e.to_string()))?;
        if !response.is_success() {
            return Err(discovery(format!("{} answered HTTP {}", source.base_url, response.status)));
        }

        let mut body = response.body;
        let mut page = Vec::new();
        while let Some(piece) = body.next().await {
            page.extend_from_slice(&piece.map_err(|e| discovery(e.to_string()))?);
        }
        let html = String::from_utf8_lossy(&page);

        let urls = self.extract(&source.base_url, &html);
        debug!(source = %source.name, files = urls.len(), "catalog listed");
        Ok(urls
            .into_iter()
            .map(|url| RemoteFile::in_directory(url, directory))
            .collect())
    }
}

/// Resolve `link` against the page URL `base` the way a browser does.
pub fn resolve(base: &str, link: &str) -> std::result::Result<String, url::ParseError> {
    Ok(Url::parse(base)?.join(link)?.to_string())
}

/// `base` with a trailing slash, so relative links land inside it.
fn directory_url(base: &str) -> String {
    if base.ends_with('/') { base.to_string() } else { format!("{base}/") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_keeps_absolute_links() {
        assert_eq!(resolve("https://a.gov/dados/", "https://b.gov/x.zip").unwrap(), "https://b.gov/x.zip");
    }

    #[test]
    fn resolve_relative_links() {
        assert_eq!(resolve("https://a.gov/dados/", "x.zip").unwrap(), "https://a.gov/dados/x.zip");
        assert_eq!(resolve("https://a.gov/dados/index.html", "./x.zip").unwrap(), "https://a.gov/dados/x.zip");
        assert_eq!(resolve("https://a.gov/dados/2024/", "../x.zip").unwrap(), "https://a.gov/dados/x.zip");
        assert_eq!(resolve("https://a.gov", "x.zip").unwrap(), "https://a.gov/x.zip");
    }

    #[test]
    fn resolve_dotted_directories() {
        assert_eq!(resolve("https://a.gov/v1.2/", "x.zip").unwrap(), "https://a.gov/v1.2/x.zip");
        assert_eq!(
            resolve(&directory_url("https://a.gov/v1.2"), "x.zip").unwrap(),
            "https://a.gov/v1.2/x.zip"
        );
    }

    #[test]
    fn resolve_root_relative_links() {
        assert_eq!(resolve("https://a.gov/dados/2024/", "/files/x.zip").unwrap(), "https://a.gov/files/x.zip");
    }

    #[test]
    fn resolve_rejects_relative_base() {
        assert!(resolve("dados/", "x.zip").is_err());
    }

    #[test]
    fn directory_url_adds_one_slash() {
        assert_eq!(directory_url("https://a.gov/dados"), "https://a.gov/dados/");
        assert_eq!(directory_url("https://a.gov/dados/"), "https://a.gov/dados/");
    }

    #[test]
    fn extract_filters_and_dedups_links() {
        let html = r#"
            <a href="Empresas0.zip">Empresas0.zip</a>
            <a HREF='Socios1.ZIP'>Socios1</a>
            <a href="../">Parent</a>
            <a href="readme.txt">readme</a>
            <a href="Empresas0.zip">again</a>
        "#;
        let catalog = DirectoryListingCatalog::new([".zip"]);
        assert_eq!(catalog.extract("https://a.gov/dados/", html), vec![
            "https://a.gov/dados/Empresas0.zip".to_string(),
            "https://a.gov/dados/Socios1.ZIP".to_string(),
        ]);
    }
}
