use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::catalog::{Catalog, CatalogEntry};
use crate::parser;
use crate::source::DocumentSource;
use crate::stats::PlayAnalysis;

/// Outcome stored for a location. Failures are remembered like successes and
/// are never retried for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CacheEntry {
    Success(Arc<PlayAnalysis>),
    Failure { error: String },
}

impl CacheEntry {
    pub fn analysis(&self) -> Option<&PlayAnalysis> {
        match self {
            CacheEntry::Success(a) => Some(a),
            CacheEntry::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CacheEntry::Success(_) => None,
            CacheEntry::Failure { error } => Some(error),
        }
    }
}

#[derive(Debug)]
pub struct CachedAnalysis {
    pub entry: CacheEntry,
    pub stored_at: DateTime<Utc>,
}

type Slot = Arc<OnceCell<Arc<CachedAnalysis>>>;

/// Per-location memo of play analyses. Each location gets its own cell, so
/// concurrent callers for the same play wait on one computation while other
/// plays proceed independently.
pub struct AnalysisCache {
    source: Arc<dyn DocumentSource>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl AnalysisCache {
    pub fn new(source: Arc<dyn DocumentSource>) -> Self {
        Self {
            source,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_analysis(&self, location: &str) -> Arc<CachedAnalysis> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(slots.entry(location.to_string()).or_default())
        };
        Arc::clone(slot.get_or_init(|| self.compute(location)).await)
    }

    async fn compute(&self, location: &str) -> Arc<CachedAnalysis> {
        info!("Analyzing play: {}", location);
        let entry = match self.source.fetch_and_parse(location).await {
            Ok(doc) => CacheEntry::Success(Arc::new(parser::analyze_document(&doc))),
            Err(e) => {
                warn!("Error analyzing play {}: {}", location, e);
                CacheEntry::Failure {
                    error: e.to_string(),
                }
            }
        };
        Arc::new(CachedAnalysis {
            entry,
            stored_at: Utc::now(),
        })
    }

    /// Locations with a stored outcome, in no particular order.
    pub fn stored(&self) -> Vec<(String, Arc<CachedAnalysis>)> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .iter()
            .filter_map(|(loc, slot)| slot.get().map(|c| (loc.clone(), Arc::clone(c))))
            .collect()
    }
}

/// Single-slot memo of the play catalog. A failed fetch stores an empty list,
/// which then sticks like any other value.
pub struct CatalogCache {
    catalog: Arc<dyn Catalog>,
    slot: OnceCell<Arc<Vec<CatalogEntry>>>,
}

impl CatalogCache {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            catalog,
            slot: OnceCell::new(),
        }
    }

    pub async fn get_catalog(&self) -> Arc<Vec<CatalogEntry>> {
        let plays = self
            .slot
            .get_or_init(|| async {
                match self.catalog.list().await {
                    Ok(list) => Arc::new(list),
                    Err(e) => {
                        warn!("Error fetching plays: {}", e);
                        Arc::new(Vec::new())
                    }
                }
            })
            .await;
        Arc::clone(plays)
    }
}
