use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::clock::Clock;
use crate::db::Repository;
use crate::error::Result;
use crate::models::{CachedDocument, ShowDocument};
use crate::provider::MetadataProvider;

/// Manual-refresh cache of provider documents.
///
/// Reads never touch the network and nothing expires on its own; a document
/// only changes when [`MetadataCache::refresh`] is called for it.
#[derive(Clone)]
pub struct MetadataCache {
    repo: Repository,
    provider: Arc<dyn MetadataProvider>,
    clock: Arc<dyn Clock>,
}

impl MetadataCache {
    pub fn new(
        repo: Repository,
        provider: Arc<dyn MetadataProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            provider,
            clock,
        }
    }

    pub async fn get(&self, catalog_id: i64) -> Result<Option<ShowDocument>> {
        let Some(cached) = self.repo.get_document(catalog_id).await? else {
            return Ok(None);
        };
        let document = serde_json::from_str(&cached.payload)?;
        Ok(Some(document))
    }

    /// Pulls the document and its latest season from the provider and
    /// replaces whatever was cached. Nothing is written if either pull fails.
    pub async fn refresh(&self, catalog_id: i64) -> Result<ShowDocument> {
        let mut document = self.provider.fetch_document(catalog_id).await?;
        if document.number_of_seasons > 0 {
            document.latest_season_episodes = self
                .provider
                .fetch_episodes(catalog_id, document.number_of_seasons)
                .await?;
        }

        let payload = serde_json::to_string(&document)?;
        self.repo
            .put_document(CachedDocument {
                catalog_id,
                payload,
                language: self.provider.language().to_string(),
                fetched_at: self.clock.now(),
            })
            .await?;

        tracing::info!("Refreshed metadata for {} ({})", document.name, catalog_id);
        Ok(document)
    }

    /// Returns the cached document, refreshing only when nothing is cached.
    /// The flag reports whether the cache was hit.
    pub async fn get_or_refresh(&self, catalog_id: i64) -> Result<(ShowDocument, bool)> {
        if let Some(document) = self.get(catalog_id).await? {
            return Ok((document, true));
        }
        let document = self.refresh(catalog_id).await?;
        Ok((document, false))
    }

    /// Refresh several documents concurrently, returning the ones that succeeded.
    pub async fn refresh_many(&self, catalog_ids: Vec<i64>) -> Vec<(i64, ShowDocument)> {
        stream::iter(catalog_ids)
            .map(|catalog_id| async move {
                match self.refresh(catalog_id).await {
                    Ok(document) => Some((catalog_id, document)),
                    Err(e) => {
                        tracing::warn!("Failed to refresh {}: {}", catalog_id, e);
                        None
                    }
                }
            })
            .buffer_unordered(4)
            .filter_map(|r| async { r })
            .collect()
            .await
    }
}
