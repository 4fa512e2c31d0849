use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::AnalysisResult;
use crate::parser::tree::Document;

/// Where play documents come from. Implementations only fetch bytes; parsing
/// is shared unless a source needs something special.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_bytes(&self, location: &str) -> AnalysisResult<Vec<u8>>;

    fn parse_into_tree(&self, bytes: &[u8]) -> AnalysisResult<Document> {
        Document::parse(bytes)
    }

    async fn fetch_and_parse(&self, location: &str) -> AnalysisResult<Document> {
        let bytes = self.fetch_bytes(location).await?;
        self.parse_into_tree(&bytes)
    }
}

/// Fetches plays over HTTP(S). Non-2xx responses count as unavailable.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> AnalysisResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn fetch_bytes(&self, location: &str) -> AnalysisResult<Vec<u8>> {
        let start = Instant::now();
        let response = self
            .client
            .get(location)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;
        info!(
            "Fetched {} ({} bytes in {}ms)",
            location,
            body.len(),
            start.elapsed().as_millis()
        );
        Ok(body.to_vec())
    }
}

/// Reads plays from the local filesystem; the location is a path.
#[derive(Default)]
pub struct FileSource;

#[async_trait]
impl DocumentSource for FileSource {
    async fn fetch_bytes(&self, location: &str) -> AnalysisResult<Vec<u8>> {
        debug!("Reading {}", location);
        Ok(tokio::fs::read(location).await?)
    }
}

#[cfg(test)]
pub use memory::MemorySource;

#[cfg(test)]
mod memory {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::DocumentSource;
    use crate::error::{AnalysisError, AnalysisResult};

    /// In-memory documents keyed by location, counting every fetch.
    #[derive(Default)]
    pub struct MemorySource {
        docs: HashMap<String, Vec<u8>>,
        delay: Option<Duration>,
        fetches: AtomicUsize,
    }

    impl MemorySource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_doc(mut self, location: &str, xml: &str) -> Self {
            self.docs.insert(location.to_string(), xml.as_bytes().to_vec());
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentSource for MemorySource {
        async fn fetch_bytes(&self, location: &str) -> AnalysisResult<Vec<u8>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.docs
                .get(location)
                .cloned()
                .ok_or_else(|| AnalysisError::SourceUnavailable(format!("404 Not Found: {}", location)))
        }
    }
}
