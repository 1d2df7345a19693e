use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;

use crate::clock::Clock;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{
    EpisodeInfo, NewEpisode, NewReminder, ReminderKind, ShowDocument, ShowStatus, TrackedItem,
};

use super::cache::MetadataCache;
use super::matcher::format_episode_token;
use super::subscription::{infer_availability_label, new_item_from_document};

const SERIES_ENDED_DESCRIPTION: &str = "Series has ended, tidy up and archive the local files";

/// Outcome of one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub new_episode_reminders: usize,
    pub series_ended_reminders: usize,
    /// Items without a cached document yet.
    pub skipped: usize,
    pub errors: usize,
}

/// Brings reminders in line with the cached provider documents.
pub struct Reconciler {
    repo: Repository,
    cache: MetadataCache,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    pub fn new(repo: Repository, cache: MetadataCache, clock: Arc<dyn Clock>) -> Self {
        Self { repo, cache, clock }
    }

    /// Reconciles every non-archived item against its cached document.
    ///
    /// Items are independent: a failure in one is logged and counted, and the
    /// pass moves on. Items with nothing cached are skipped, never fetched.
    pub async fn reconcile_all(&self) -> Result<SyncReport> {
        let items = self.repo.active_items().await?;
        let mut report = SyncReport::default();

        for item in items {
            let document = match self.cache.get(item.catalog_id).await {
                Ok(Some(document)) => document,
                Ok(None) => {
                    tracing::debug!(
                        "No cached metadata for {} ({}), skipping",
                        item.name,
                        item.catalog_id
                    );
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Failed to load cached metadata for {}: {}", item.name, e);
                    report.errors += 1;
                    continue;
                }
            };

            self.reconcile_item(item, &document, &mut report).await;
        }

        tracing::info!(
            "Reconciliation finished: {} new episode, {} series ended, {} skipped, {} errors",
            report.new_episode_reminders,
            report.series_ended_reminders,
            report.skipped,
            report.errors
        );
        Ok(report)
    }

    /// Refreshes one series from the provider and reconciles it right away,
    /// creating the item if it isn't tracked yet. Any failure is returned.
    pub async fn refresh_show(&self, catalog_id: i64) -> Result<SyncReport> {
        let document = self.cache.refresh(catalog_id).await?;
        let mut item = match self.repo.get_item_by_catalog_id(catalog_id).await? {
            Some(item) => item,
            None => {
                self.repo
                    .insert_item(new_item_from_document(catalog_id, &document), self.clock.now())
                    .await?
            }
        };

        let mut report = SyncReport::default();
        if item.is_archived {
            tracing::debug!("{} is archived, leaving it untouched", item.name);
            return Ok(report);
        }

        self.apply_document(&mut item, &document).await?;
        mirror_episodes(&self.repo, item.catalog_id, &document.latest_season_episodes).await?;
        if self.derive_new_episode(&item, &document).await?.is_some() {
            report.new_episode_reminders += 1;
        }
        if self.derive_series_ended(&item, &document).await?.is_some() {
            report.series_ended_reminders += 1;
        }
        Ok(report)
    }

    async fn reconcile_item(
        &self,
        mut item: TrackedItem,
        document: &ShowDocument,
        report: &mut SyncReport,
    ) {
        if let Err(e) = self.apply_document(&mut item, document).await {
            tracing::warn!("Failed to update {}: {}", item.name, e);
            report.errors += 1;
        }

        if let Err(e) =
            mirror_episodes(&self.repo, item.catalog_id, &document.latest_season_episodes).await
        {
            tracing::warn!("Failed to mirror episodes for {}: {}", item.name, e);
            report.errors += 1;
        }

        match self.derive_new_episode(&item, document).await {
            Ok(Some(_)) => report.new_episode_reminders += 1,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Failed to check new episodes for {}: {}", item.name, e);
                report.errors += 1;
            }
        }

        match self.derive_series_ended(&item, document).await {
            Ok(Some(_)) => report.series_ended_reminders += 1,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Failed to check series end for {}: {}", item.name, e);
                report.errors += 1;
            }
        }
    }

    /// Copies name, season count and status from the document. A changed
    /// region re-derives the availability label unless it was set by hand.
    async fn apply_document(&self, item: &mut TrackedItem, document: &ShowDocument) -> Result<()> {
        item.name = document.name.clone();
        item.season_count = document.number_of_seasons;
        item.status = ShowStatus::from_provider(&document.status);

        if let Some(country) = document.primary_country() {
            if item.origin_country != country {
                item.origin_country = country.to_string();
                if !item.label_is_manual {
                    item.availability_label = infer_availability_label(country).to_string();
                }
            }
        }

        self.repo.update_item(item, self.clock.now()).await
    }

    /// Creates at most one NEW_EPISODE reminder, checking the next airing
    /// episode before the most recent one.
    async fn derive_new_episode(
        &self,
        item: &TrackedItem,
        document: &ShowDocument,
    ) -> Result<Option<i64>> {
        let now = self.clock.now();
        let candidates = [
            document.next_episode_to_air.as_ref(),
            document.last_episode_to_air.as_ref(),
        ];

        for episode in candidates.into_iter().flatten() {
            if let Some(id) = self.create_episode_reminder(item, episode, now).await? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    async fn create_episode_reminder(
        &self,
        item: &TrackedItem,
        episode: &EpisodeInfo,
        now: DateTime<FixedOffset>,
    ) -> Result<Option<i64>> {
        let Some(air_date) = episode.air_date() else {
            return Ok(None);
        };

        // Air dates carry no zone; read them as calendar days in the clock's offset.
        let air_date = parse_air_date(air_date)?;
        if air_date > now.date_naive() {
            return Ok(None);
        }

        let token = format_episode_token(episode.season_number, episode.episode_number);
        if let Some(existing) = self.repo.find_episode_reminder(item.id, &token).await? {
            tracing::debug!(
                "Reminder {} already covers {} {}",
                existing.id,
                item.name,
                token
            );
            return Ok(None);
        }

        let id = self
            .repo
            .insert_reminder(NewReminder {
                item_id: item.id,
                kind: ReminderKind::NewEpisode,
                description: episode_description(&token, &episode.name),
                created_at: now,
            })
            .await?;

        tracing::info!("New episode reminder for {} {}", item.name, token);
        Ok(Some(id))
    }

    async fn derive_series_ended(
        &self,
        item: &TrackedItem,
        document: &ShowDocument,
    ) -> Result<Option<i64>> {
        if !ShowStatus::from_provider(&document.status).is_finished() {
            return Ok(None);
        }
        if self
            .repo
            .has_open_reminder(item.id, ReminderKind::SeriesEnded)
            .await?
        {
            return Ok(None);
        }

        let id = self
            .repo
            .insert_reminder(NewReminder {
                item_id: item.id,
                kind: ReminderKind::SeriesEnded,
                description: SERIES_ENDED_DESCRIPTION.to_string(),
                created_at: self.clock.now(),
            })
            .await?;

        tracing::info!("Series ended reminder for {}", item.name);
        Ok(Some(id))
    }
}

/// Description of a NEW_EPISODE reminder. The `<token>|` prefix is what the
/// episode matcher keys on.
fn episode_description(token: &str, title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        format!("{token}|New episode: {token}")
    } else {
        format!("{token}|New episode: {token} - {title}")
    }
}

fn parse_air_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| AppError::InvalidDate(format!("{}: {}", value, e)))
}

/// Upserts provider episodes into the local mirror.
pub(crate) async fn mirror_episodes(
    repo: &Repository,
    catalog_id: i64,
    episodes: &[EpisodeInfo],
) -> Result<usize> {
    for info in episodes {
        repo.upsert_episode(NewEpisode {
            catalog_id,
            season: info.season_number,
            episode: info.episode_number,
            title: info.name.clone(),
            synopsis: info.overview.clone(),
            air_date: info.air_date().and_then(|date| parse_air_date(date).ok()),
        })
        .await?;
    }
    Ok(episodes.len())
}
