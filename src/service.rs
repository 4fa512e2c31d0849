use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::cache::{AnalysisCache, CacheEntry, CachedAnalysis, CatalogCache};
use crate::catalog::{Catalog, CatalogEntry};
use crate::error::{AnalysisError, AnalysisResult};
use crate::parser::dialogue::dialogue_groups;
use crate::source::DocumentSource;
use crate::stats::{self, Ranking};

/// Words returned by the single-character lookup.
pub const CHARACTER_WORDS_LIMIT: usize = 20;

pub const UNKNOWN_PLAY: &str = "Unknown Play";

#[derive(Debug, Clone, Serialize)]
pub struct NamedAnalysis {
    pub name: String,
    pub analysis: CacheEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub play1: NamedAnalysis,
    pub play2: NamedAnalysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct CharacterWords {
    pub character: String,
    pub words: Ranking,
}

/// Everything a query needs: the catalog, the analysis cache and the document
/// source behind it. One instance lives for the whole process and is shared
/// through an `Arc`.
pub struct PlayService {
    source: Arc<dyn DocumentSource>,
    catalog: CatalogCache,
    analyses: AnalysisCache,
}

impl PlayService {
    pub fn new(source: Arc<dyn DocumentSource>, catalog: Arc<dyn Catalog>) -> Self {
        Self {
            analyses: AnalysisCache::new(Arc::clone(&source)),
            catalog: CatalogCache::new(catalog),
            source,
        }
    }

    pub async fn plays(&self) -> Arc<Vec<CatalogEntry>> {
        self.catalog.get_catalog().await
    }

    /// Map a catalog index to its entry. Never touches the document source.
    pub async fn resolve(&self, index: usize) -> AnalysisResult<CatalogEntry> {
        let plays = self.plays().await;
        plays.get(index).cloned().ok_or(AnalysisError::InvalidIndex {
            index,
            len: plays.len(),
        })
    }

    pub async fn analysis(&self, location: &str) -> Arc<CachedAnalysis> {
        self.analyses.get_analysis(location).await
    }

    pub async fn play(&self, index: usize) -> AnalysisResult<(CatalogEntry, Arc<CachedAnalysis>)> {
        let entry = self.resolve(index).await?;
        let cached = self.analysis(&entry.location).await;
        Ok((entry, cached))
    }

    pub async fn compare(&self, first: usize, second: usize) -> AnalysisResult<Comparison> {
        let a = self.resolve(first).await?;
        let b = self.resolve(second).await?;
        let (analysis1, analysis2) =
            tokio::join!(self.analysis(&a.location), self.analysis(&b.location));
        Ok(Comparison {
            play1: NamedAnalysis {
                name: a.title,
                analysis: analysis1.entry.clone(),
            },
            play2: NamedAnalysis {
                name: b.title,
                analysis: analysis2.entry.clone(),
            },
        })
    }

    /// Word ranking for one character, first twenty entries. This path
    /// refetches and reparses on every call; it does not read or fill the
    /// analysis cache.
    pub async fn character_words(&self, index: usize, character: &str) -> AnalysisResult<CharacterWords> {
        let entry = self.resolve(index).await?;
        info!("Word lookup for {:?} in {}", character, entry.location);
        let doc = self.source.fetch_and_parse(&entry.location).await?;
        let groups: Vec<_> = dialogue_groups(&doc).collect();
        let mut words = stats::words_by_character(&groups, character);
        words.truncate(CHARACTER_WORDS_LIMIT);
        Ok(CharacterWords {
            character: character.to_string(),
            words,
        })
    }

    /// Catalog title for a location, or "Unknown Play".
    pub async fn play_name(&self, location: &str) -> String {
        self.plays()
            .await
            .iter()
            .find(|p| p.location == location)
            .map(|p| p.title.clone())
            .unwrap_or_else(|| UNKNOWN_PLAY.to_string())
    }

    pub fn cached(&self) -> Vec<(String, Arc<CachedAnalysis>)> {
        self.analyses.stored()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FixedCatalog;
    use crate::source::MemorySource;

    fn hamlet() -> String {
        std::fs::read_to_string("tests/fixtures/hamlet_excerpt.xml").unwrap()
    }

    fn service(source: Arc<MemorySource>) -> PlayService {
        let catalog = FixedCatalog::new(&[
            ("mem://hamlet", "Hamlet"),
            ("mem://broken", "Broken"),
            ("mem://missing", "Missing"),
        ]);
        PlayService::new(source, Arc::new(catalog))
    }

    fn source() -> Arc<MemorySource> {
        Arc::new(
            MemorySource::new()
                .with_doc("mem://hamlet", &hamlet())
                .with_doc("mem://broken", "<PLAY>"),
        )
    }

    #[tokio::test]
    async fn invalid_index_does_not_fetch() {
        let source = source();
        let svc = service(source.clone());

        let err = svc.character_words(5, "HAMLET").await.unwrap_err();
        assert_eq!(err, AnalysisError::InvalidIndex { index: 5, len: 3 });
        assert!(svc.play(3).await.is_err());
        assert_eq!(source.fetches(), 0);
    }

    #[tokio::test]
    async fn play_resolves_and_caches() {
        let source = source();
        let svc = service(source.clone());

        let (entry, cached) = svc.play(0).await.unwrap();
        assert_eq!(entry.title, "Hamlet");
        assert_eq!(cached.entry.analysis().unwrap().total_lines, 18);
        svc.play(0).await.unwrap();
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test]
    async fn broken_play_is_failure_not_error() {
        let svc = service(source());
        let (_, cached) = svc.play(1).await.unwrap();
        assert!(cached.entry.error().is_some());
        let (_, cached) = svc.play(2).await.unwrap();
        assert!(cached.entry.error().unwrap().starts_with("source unavailable"));
    }

    #[tokio::test]
    async fn character_words_bypass_cache() {
        let source = source();
        let svc = service(source.clone());

        let words = svc.character_words(0, "HAMLET").await.unwrap();
        assert_eq!(words.character, "HAMLET");
        assert_eq!(words.words[0], ("to".to_string(), 4));
        assert!(words.words.len() <= CHARACTER_WORDS_LIMIT);

        svc.character_words(0, "HAMLET").await.unwrap();
        assert_eq!(source.fetches(), 2);
        assert!(svc.cached().is_empty());
    }

    #[tokio::test]
    async fn character_words_exact_name() {
        let svc = service(source());
        let words = svc.character_words(0, "hamlet").await.unwrap();
        assert!(words.words.is_empty());
        let words = svc.character_words(0, "Hamlet").await.unwrap();
        assert_eq!(words.words[0], ("words,".to_string(), 2));
    }

    #[tokio::test]
    async fn character_words_reports_fetch_errors() {
        let svc = service(source());
        let err = svc.character_words(2, "A").await.unwrap_err();
        assert!(matches!(err, AnalysisError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn compare_two_plays() {
        let svc = service(source());
        let cmp = svc.compare(0, 1).await.unwrap();
        assert_eq!(cmp.play1.name, "Hamlet");
        assert!(cmp.play1.analysis.analysis().is_some());
        assert_eq!(cmp.play2.name, "Broken");
        assert!(cmp.play2.analysis.error().is_some());
        assert!(svc.compare(0, 9).await.is_err());
    }

    #[tokio::test]
    async fn play_name_lookup() {
        let svc = service(source());
        assert_eq!(svc.play_name("mem://hamlet").await, "Hamlet");
        assert_eq!(svc.play_name("mem://nope").await, UNKNOWN_PLAY);
    }

    #[tokio::test]
    async fn empty_catalog_makes_every_index_invalid() {
        let source = source();
        let svc = PlayService::new(source.clone(), Arc::new(FixedCatalog::failing()));
        assert!(matches!(
            svc.play(0).await,
            Err(AnalysisError::InvalidIndex { index: 0, len: 0 })
        ));
        assert_eq!(source.fetches(), 0);
    }
}
