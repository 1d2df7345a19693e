use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::Repository;
use crate::error::Result;
use crate::models::{AiringEpisode, EpisodeRecord, Reminder, SearchResult, TrackedItem};
use crate::provider::{MetadataProvider, TmdbClient};
use crate::services::{
    AiringDay, Dashboard, LifecycleService, MetadataCache, Reconciler, SubscriptionManager, SyncReport,
    TaskBoard,
};

/// Wires the store, provider and services together for the binary.
pub struct App {
    pub repository: Repository,
    provider: Arc<dyn MetadataProvider>,
    cache: MetadataCache,
    reconciler: Reconciler,
    lifecycle: LifecycleService,
    subscriptions: SubscriptionManager,
    board: TaskBoard,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        let provider = TmdbClient::new(
            config.tmdb_api_key.clone(),
            &config.tmdb_base_url,
            &config.language,
        )?;

        Ok(Self::with_parts(
            repository,
            Arc::new(provider),
            Arc::new(SystemClock),
        ))
    }

    pub fn with_parts(
        repository: Repository,
        provider: Arc<dyn MetadataProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = MetadataCache::new(repository.clone(), provider.clone(), clock.clone());

        Self {
            reconciler: Reconciler::new(repository.clone(), cache.clone(), clock.clone()),
            lifecycle: LifecycleService::new(repository.clone(), clock.clone()),
            subscriptions: SubscriptionManager::new(
                repository.clone(),
                cache.clone(),
                clock.clone(),
            ),
            board: TaskBoard::new(repository.clone(), clock),
            provider,
            cache,
            repository,
        }
    }

    /// Title search against the provider, to find the id `subscribe` wants.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.provider.search(query).await
    }

    pub async fn subscribe(&self, catalog_id: i64) -> Result<(TrackedItem, bool)> {
        self.subscriptions.subscribe(catalog_id).await
    }

    pub async fn unsubscribe(&self, item_id: i64) -> Result<()> {
        self.subscriptions.unsubscribe(item_id).await
    }

    pub async fn set_label(&self, item_id: i64, label: &str) -> Result<()> {
        self.subscriptions.set_availability_label(item_id, label).await
    }

    pub async fn items(&self) -> Result<Vec<TrackedItem>> {
        self.subscriptions.list().await
    }

    /// Mirrored episodes of one series, in season order.
    pub async fn episodes(&self, catalog_id: i64) -> Result<Vec<EpisodeRecord>> {
        self.repository.episodes_for(catalog_id).await
    }

    pub async fn refresh_show(&self, catalog_id: i64) -> Result<SyncReport> {
        self.reconciler.refresh_show(catalog_id).await
    }

    /// Refreshes every active item's document, then runs a reconciliation
    /// pass. Items whose refresh failed are reconciled against their last
    /// cached document.
    pub async fn sync(&self) -> Result<SyncReport> {
        let catalog_ids: Vec<i64> = self
            .repository
            .active_items()
            .await?
            .into_iter()
            .map(|item| item.catalog_id)
            .collect();

        let requested = catalog_ids.len();
        let refreshed = self.cache.refresh_many(catalog_ids).await;
        if refreshed.len() < requested {
            tracing::warn!(
                "Refreshed {} of {} series, the rest use cached data",
                refreshed.len(),
                requested
            );
        }

        self.reconciler.reconcile_all().await
    }

    pub async fn complete(&self, reminder_id: i64) -> Result<Reminder> {
        self.lifecycle.complete(reminder_id).await
    }

    pub async fn postpone(&self, reminder_id: i64) -> Result<Reminder> {
        self.lifecycle.postpone(reminder_id).await
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        self.board.dashboard().await
    }

    pub async fn airing_today(&self) -> Result<Vec<AiringEpisode>> {
        self.board.airing_today().await
    }

    pub async fn airing_this_week(&self) -> Result<Vec<AiringDay>> {
        self.board.airing_this_week().await
    }
}
