//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::DateTime;

use crate::clock::FixedClock;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{EpisodeInfo, SearchResult, ShowDocument};
use crate::provider::MetadataProvider;

/// In-memory provider serving whatever documents the test put in it.
#[derive(Default)]
pub struct StaticProvider {
    documents: Mutex<HashMap<i64, ShowDocument>>,
    episodes: Mutex<HashMap<(i64, i32), Vec<EpisodeInfo>>>,
    fetches: AtomicUsize,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_document(&self, document: ShowDocument) {
        self.documents.lock().unwrap().insert(document.id, document);
    }

    pub fn remove_document(&self, catalog_id: i64) {
        self.documents.lock().unwrap().remove(&catalog_id);
    }

    pub fn set_episodes(&self, catalog_id: i64, season: i32, episodes: Vec<EpisodeInfo>) {
        self.episodes
            .lock()
            .unwrap()
            .insert((catalog_id, season), episodes);
    }

    /// Number of document fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for StaticProvider {
    async fn fetch_document(&self, catalog_id: i64) -> Result<ShowDocument> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.documents
            .lock()
            .unwrap()
            .get(&catalog_id)
            .cloned()
            .ok_or_else(|| AppError::Provider(format!("TMDB API error (code 34): {catalog_id}")))
    }

    async fn fetch_episodes(&self, catalog_id: i64, season: i32) -> Result<Vec<EpisodeInfo>> {
        Ok(self
            .episodes
            .lock()
            .unwrap()
            .get(&(catalog_id, season))
            .cloned()
            .unwrap_or_default())
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let mut results: Vec<SearchResult> = self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|doc| doc.name.to_lowercase().contains(&needle))
            .map(|doc| SearchResult {
                id: doc.id,
                name: doc.name.clone(),
                original_name: doc.original_name.clone(),
                first_air_date: doc.first_air_date.clone(),
                origin_country: doc.origin_country.clone(),
                overview: String::new(),
            })
            .collect();
        results.sort_by_key(|result| result.id);
        Ok(results)
    }

    fn language(&self) -> &str {
        "en-US"
    }
}

pub fn clock_at(instant: &str) -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        DateTime::parse_from_rfc3339(instant).unwrap(),
    ))
}

pub async fn memory_repository() -> Repository {
    Repository::new(":memory:").await.unwrap()
}

pub fn episode(season: i32, number: i32, air_date: &str, name: &str) -> EpisodeInfo {
    EpisodeInfo {
        air_date: Some(air_date.to_string()),
        episode_number: number,
        season_number: season,
        name: name.to_string(),
        overview: format!("Overview of {name}"),
    }
}

pub fn document(catalog_id: i64, name: &str, status: &str, country: &str) -> ShowDocument {
    ShowDocument {
        id: catalog_id,
        name: name.to_string(),
        original_name: name.to_string(),
        status: status.to_string(),
        origin_country: vec![country.to_string()],
        number_of_seasons: 1,
        ..ShowDocument::default()
    }
}
