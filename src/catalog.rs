use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::error::AnalysisResult;

pub const DEFAULT_CATALOG_URL: &str = "http://www.ibiblio.org/xml/examples/shakespeare/";

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>(.*?)</a\s*>"#).unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// One play in the catalog: where to fetch it and what to call it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub location: String,
    pub title: String,
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn list(&self) -> AnalysisResult<Vec<CatalogEntry>>;
}

/// Scrapes a directory index page: every anchor becomes an entry, in page order.
pub struct HttpCatalog {
    client: reqwest::Client,
    index_url: String,
}

impl HttpCatalog {
    pub fn new(index_url: impl Into<String>, timeout: Duration) -> AnalysisResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            index_url: index_url.into(),
        })
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn list(&self) -> AnalysisResult<Vec<CatalogEntry>> {
        info!("Fetching play catalog: {}", self.index_url);
        let html = self
            .client
            .get(&self.index_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let entries = parse_index(&self.index_url, &html);
        info!("Plays in catalog: {}", entries.len());
        Ok(entries)
    }
}

/// Lists `*.xml` files of a local directory, sorted by file name.
pub struct DirCatalog {
    dir: PathBuf,
}

impl DirCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Catalog for DirCatalog {
    async fn list(&self) -> AnalysisResult<Vec<CatalogEntry>> {
        let mut read_dir = tokio::fs::read_dir(&self.dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("xml")) {
                paths.push(path);
            }
        }
        paths.sort();

        let entries: Vec<CatalogEntry> = paths
            .into_iter()
            .map(|path| CatalogEntry {
                title: path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                location: path.to_string_lossy().into_owned(),
            })
            .collect();
        info!("Plays in {}: {}", self.dir.display(), entries.len());
        Ok(entries)
    }
}

/// Extract `(base + href, anchor text)` pairs from an index page. The href is
/// appended to the base verbatim, without URL resolution.
pub fn parse_index(base: &str, html: &str) -> Vec<CatalogEntry> {
    ANCHOR_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let href = caps.get(1).or_else(|| caps.get(2))?.as_str();
            Some(CatalogEntry {
                location: format!("{}{}", base, href),
                title: anchor_text(&caps[3]),
            })
        })
        .collect()
}

fn anchor_text(inner: &str) -> String {
    let stripped = TAG_RE.replace_all(inner, "");
    match quick_xml::escape::unescape(&stripped) {
        Ok(text) => text.into_owned(),
        Err(_) => stripped.into_owned(),
    }
}

#[cfg(test)]
pub use fixed::FixedCatalog;

#[cfg(test)]
mod fixed {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::{Catalog, CatalogEntry};
    use crate::error::{AnalysisError, AnalysisResult};

    /// Canned catalog for tests; `None` simulates an unreachable index.
    pub struct FixedCatalog {
        entries: Option<Vec<CatalogEntry>>,
        calls: AtomicUsize,
    }

    impl FixedCatalog {
        pub fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                entries: Some(
                    entries
                        .iter()
                        .map(|(location, title)| CatalogEntry {
                            location: location.to_string(),
                            title: title.to_string(),
                        })
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                entries: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Catalog for FixedCatalog {
        async fn list(&self) -> AnalysisResult<Vec<CatalogEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entries
                .clone()
                .ok_or_else(|| AnalysisError::SourceUnavailable("connection refused".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_fixture() {
        let html = std::fs::read_to_string("tests/fixtures/index.html").unwrap();
        let entries = parse_index(DEFAULT_CATALOG_URL, &html);
        assert_eq!(
            entries,
            vec![
                CatalogEntry {
                    location: format!("{}hamlet.xml", DEFAULT_CATALOG_URL),
                    title: "The Tragedy of Hamlet, Prince of Denmark".into(),
                },
                CatalogEntry {
                    location: format!("{}macbeth.xml", DEFAULT_CATALOG_URL),
                    title: "The Tragedy of Macbeth".into(),
                },
                CatalogEntry {
                    location: format!("{}much_ado.xml", DEFAULT_CATALOG_URL),
                    title: "Much Ado about Nothing & more".into(),
                },
            ]
        );
    }

    #[test]
    fn anchors_without_href_are_skipped() {
        let entries = parse_index("http://x/", r#"<a name="top">Top</a><a href="a.xml">A</a>"#);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].location, "http://x/a.xml");
    }

    #[test]
    fn no_anchors() {
        assert!(parse_index("http://x/", "<p>nothing here</p>").is_empty());
    }

    #[tokio::test]
    async fn dir_catalog_lists_xml_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["othello.xml", "hamlet.xml", "notes.txt", "LEAR.XML"] {
            std::fs::write(dir.path().join(name), "<PLAY/>").unwrap();
        }
        let entries = DirCatalog::new(dir.path()).list().await.unwrap();
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["LEAR", "hamlet", "othello"]);
        assert!(entries[1].location.ends_with("hamlet.xml"));
    }

    #[tokio::test]
    async fn dir_catalog_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = DirCatalog::new(dir.path().join("missing")).list().await;
        assert!(result.is_err());
    }
}
