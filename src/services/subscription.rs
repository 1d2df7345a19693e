use std::sync::Arc;

use crate::clock::Clock;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{NewTrackedItem, ShowDocument, ShowStatus, TrackedItem};

use super::cache::MetadataCache;
use super::reconcile::mirror_episodes;

/// Label used when the origin region gives no hint.
pub const UNKNOWN_AVAILABILITY: &str = "TBD";

/// Expected time-of-day an episode becomes available, by origin region.
pub fn infer_availability_label(origin_country: &str) -> &'static str {
    match origin_country.trim().to_uppercase().as_str() {
        "US" | "UK" | "GB" | "CA" => "18:00",
        "CN" | "TW" => "20:00",
        "JP" | "KR" => "23:00",
        _ => UNKNOWN_AVAILABILITY,
    }
}

pub(crate) fn new_item_from_document(catalog_id: i64, document: &ShowDocument) -> NewTrackedItem {
    let origin_country = document.primary_country().unwrap_or_default().to_string();
    NewTrackedItem {
        catalog_id,
        name: document.name.clone(),
        season_count: document.number_of_seasons,
        status: ShowStatus::from_provider(&document.status),
        availability_label: infer_availability_label(&origin_country).to_string(),
        origin_country,
    }
}

pub struct SubscriptionManager {
    repo: Repository,
    cache: MetadataCache,
    clock: Arc<dyn Clock>,
}

impl SubscriptionManager {
    pub fn new(repo: Repository, cache: MetadataCache, clock: Arc<dyn Clock>) -> Self {
        Self { repo, cache, clock }
    }

    /// Subscribes to a series. Returns the item and whether it already existed.
    pub async fn subscribe(&self, catalog_id: i64) -> Result<(TrackedItem, bool)> {
        if let Some(existing) = self.repo.get_item_by_catalog_id(catalog_id).await? {
            return Ok((existing, true));
        }

        let (document, _) = self.cache.get_or_refresh(catalog_id).await?;
        let item = self
            .repo
            .insert_item(new_item_from_document(catalog_id, &document), self.clock.now())
            .await?;

        // Episodes are a convenience mirror; a failure here doesn't undo the subscription
        if let Err(e) =
            mirror_episodes(&self.repo, catalog_id, &document.latest_season_episodes).await
        {
            tracing::warn!("Failed to mirror episodes for {}: {}", catalog_id, e);
        }

        tracing::info!("Subscribed to {} ({})", item.name, catalog_id);
        Ok((item, false))
    }

    /// Drops the mirrored episodes and archives the item, atomically.
    pub async fn unsubscribe(&self, item_id: i64) -> Result<()> {
        let item = self
            .repo
            .get_item(item_id)
            .await?
            .ok_or_else(|| AppError::not_found("tracked item", item_id))?;

        let now = self.clock.now();
        let catalog_id = item.catalog_id;
        self.repo
            .unit_of_work(move |uow| {
                uow.delete_episodes(catalog_id)?;
                uow.archive_item(item_id, now)
            })
            .await?;

        tracing::info!("Unsubscribed from {} ({})", item.name, catalog_id);
        Ok(())
    }

    /// Pins the availability label so region inference leaves it alone.
    pub async fn set_availability_label(&self, item_id: i64, label: &str) -> Result<()> {
        let label = label.trim();
        if label.is_empty() {
            return Err(AppError::Other(anyhow::anyhow!(
                "availability label must not be empty"
            )));
        }
        self.repo
            .set_availability_label(item_id, label.to_string(), self.clock.now())
            .await
    }

    pub async fn list(&self) -> Result<Vec<TrackedItem>> {
        self.repo.all_items().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{clock_at, document, episode, memory_repository, StaticProvider};

    async fn manager(provider: Arc<StaticProvider>) -> (SubscriptionManager, Repository) {
        let repo = memory_repository().await;
        let clock = clock_at("2026-03-10T09:00:00+08:00");
        let cache = MetadataCache::new(repo.clone(), provider, clock.clone());
        (SubscriptionManager::new(repo.clone(), cache, clock), repo)
    }

    #[test]
    fn availability_label_follows_region() {
        assert_eq!(infer_availability_label("US"), "18:00");
        assert_eq!(infer_availability_label(" gb "), "18:00");
        assert_eq!(infer_availability_label("CA"), "18:00");
        assert_eq!(infer_availability_label("TW"), "20:00");
        assert_eq!(infer_availability_label("CN"), "20:00");
        assert_eq!(infer_availability_label("KR"), "23:00");
        assert_eq!(infer_availability_label("JP"), "23:00");
        assert_eq!(infer_availability_label("FR"), UNKNOWN_AVAILABILITY);
        assert_eq!(infer_availability_label(""), UNKNOWN_AVAILABILITY);
    }

    #[tokio::test]
    async fn subscribe_creates_item_and_mirrors_episodes() {
        let provider = Arc::new(StaticProvider::new());
        provider.set_document(document(1396, "Breaking Bad", "Ended", "US"));
        provider.set_episodes(
            1396,
            1,
            vec![
                episode(1, 1, "2008-01-20", "Pilot"),
                episode(1, 2, "2008-01-27", "Cat's in the Bag..."),
            ],
        );
        let (manager, repo) = manager(provider).await;

        let (item, existed) = manager.subscribe(1396).await.unwrap();
        assert!(!existed);
        assert_eq!(item.name, "Breaking Bad");
        assert_eq!(item.status, ShowStatus::Ended);
        assert_eq!(item.availability_label, "18:00");
        assert!(!item.label_is_manual);

        let episodes = repo.episodes_for(1396).await.unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].title, "Pilot");
    }

    #[tokio::test]
    async fn subscribing_twice_returns_existing_item() {
        let provider = Arc::new(StaticProvider::new());
        provider.set_document(document(1396, "Breaking Bad", "Ended", "US"));
        let (manager, _) = manager(provider.clone()).await;

        let (first, _) = manager.subscribe(1396).await.unwrap();
        let (second, existed) = manager.subscribe(1396).await.unwrap();

        assert!(existed);
        assert_eq!(first.id, second.id);
        assert_eq!(provider.fetch_count(), 1);
    }

    #[tokio::test]
    async fn subscribe_surfaces_provider_errors() {
        let provider = Arc::new(StaticProvider::new());
        let (manager, repo) = manager(provider).await;

        let err = manager.subscribe(42).await.unwrap_err();
        assert!(err.is_provider());
        assert!(repo.all_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsubscribe_archives_and_drops_episodes() {
        let provider = Arc::new(StaticProvider::new());
        provider.set_document(document(1396, "Breaking Bad", "Ended", "US"));
        provider.set_episodes(1396, 1, vec![episode(1, 1, "2008-01-20", "Pilot")]);
        let (manager, repo) = manager(provider).await;
        let (item, _) = manager.subscribe(1396).await.unwrap();

        manager.unsubscribe(item.id).await.unwrap();

        let item = repo.get_item(item.id).await.unwrap().unwrap();
        assert!(item.is_archived);
        assert!(repo.episodes_for(1396).await.unwrap().is_empty());
        assert!(repo.active_items().await.unwrap().is_empty());

        let err = manager.unsubscribe(999).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn manual_label_is_pinned() {
        let provider = Arc::new(StaticProvider::new());
        provider.set_document(document(1396, "Breaking Bad", "Ended", "US"));
        let (manager, repo) = manager(provider).await;
        let (item, _) = manager.subscribe(1396).await.unwrap();

        manager.set_availability_label(item.id, " 21:30 ").await.unwrap();

        let item = repo.get_item(item.id).await.unwrap().unwrap();
        assert_eq!(item.availability_label, "21:30");
        assert!(item.label_is_manual);

        assert!(manager.set_availability_label(item.id, "  ").await.is_err());
        let err = manager.set_availability_label(999, "20:00").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
