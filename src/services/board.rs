use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use crate::clock::Clock;
use crate::db::Repository;
use crate::error::Result;
use crate::models::{AiringEpisode, Reminder, ReminderKind};

/// Pending work, newest first within each category.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Dashboard {
    pub new_episodes: Vec<Reminder>,
    pub series_ended: Vec<Reminder>,
}

impl Dashboard {
    pub fn is_empty(&self) -> bool {
        self.new_episodes.is_empty() && self.series_ended.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new_episodes.len() + self.series_ended.len()
    }
}

/// Episodes airing on one calendar day.
#[derive(Debug, Clone, Serialize)]
pub struct AiringDay {
    pub date: NaiveDate,
    pub episodes: Vec<AiringEpisode>,
}

/// Read-only view over reminders and mirrored episodes for presentation.
pub struct TaskBoard {
    repo: Repository,
    clock: Arc<dyn Clock>,
}

impl TaskBoard {
    pub fn new(repo: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        Ok(Dashboard {
            new_episodes: self.repo.pending_reminders(ReminderKind::NewEpisode).await?,
            series_ended: self.repo.pending_reminders(ReminderKind::SeriesEnded).await?,
        })
    }

    /// Mirrored episodes whose air date is today in the clock's offset.
    pub async fn airing_today(&self) -> Result<Vec<AiringEpisode>> {
        let today = self.clock.now().date_naive();
        self.repo.episodes_airing_on(today).await
    }

    /// Monday through Sunday of the current week, one entry per day even
    /// when nothing airs.
    pub async fn airing_this_week(&self) -> Result<Vec<AiringDay>> {
        let today = self.clock.now().date_naive();
        let monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));

        let mut week = Vec::with_capacity(7);
        for date in monday.iter_days().take(7) {
            week.push(AiringDay {
                date,
                episodes: self.repo.episodes_airing_on(date).await?,
            });
        }
        Ok(week)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewEpisode, NewReminder, NewTrackedItem, ShowStatus};
    use crate::testing::{clock_at, memory_repository};
    use chrono::{DateTime, NaiveDate};

    async fn seeded_item(repo: &Repository, catalog_id: i64, name: &str) -> i64 {
        repo.insert_item(
            NewTrackedItem {
                catalog_id,
                name: name.to_string(),
                season_count: 1,
                status: ShowStatus::Ongoing,
                origin_country: "JP".to_string(),
                availability_label: "23:00".to_string(),
            },
            DateTime::parse_from_rfc3339("2026-01-01T00:00:00+08:00").unwrap(),
        )
        .await
        .unwrap()
        .id
    }

    async fn remind(repo: &Repository, item_id: i64, kind: ReminderKind, text: &str, at: &str) -> i64 {
        repo.insert_reminder(NewReminder {
            item_id,
            kind,
            description: text.to_string(),
            created_at: DateTime::parse_from_rfc3339(at).unwrap(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn dashboard_lists_pending_reminders_newest_first() {
        let repo = memory_repository().await;
        let frieren = seeded_item(&repo, 209867, "Frieren").await;
        let mushishi = seeded_item(&repo, 4542, "Mushishi").await;

        let older = remind(
            &repo,
            frieren,
            ReminderKind::NewEpisode,
            "S01E27|New episode: S01E27 - Just an Ordinary Magic",
            "2026-03-08T23:00:00+08:00",
        )
        .await;
        let newer = remind(
            &repo,
            frieren,
            ReminderKind::NewEpisode,
            "S01E28|New episode: S01E28 - It Would Be Embarrassing",
            "2026-03-09T23:00:00+08:00",
        )
        .await;
        let done = remind(
            &repo,
            mushishi,
            ReminderKind::NewEpisode,
            "S02E10|New episode: S02E10",
            "2026-03-09T23:00:00+08:00",
        )
        .await;
        let ended = remind(
            &repo,
            mushishi,
            ReminderKind::SeriesEnded,
            "Series has ended",
            "2026-03-07T23:00:00+08:00",
        )
        .await;
        repo.unit_of_work(move |uow| uow.complete_reminder(done))
            .await
            .unwrap();

        let board = TaskBoard::new(repo, clock_at("2026-03-10T09:00:00+08:00"));
        let dashboard = board.dashboard().await.unwrap();

        let ids: Vec<i64> = dashboard.new_episodes.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newer, older]);
        assert_eq!(dashboard.new_episodes[0].item_name, "Frieren");
        assert_eq!(dashboard.new_episodes[0].availability_label, "23:00");
        assert_eq!(
            dashboard.new_episodes[0].summary(),
            "New episode: S01E28 - It Would Be Embarrassing"
        );

        assert_eq!(dashboard.series_ended.len(), 1);
        assert_eq!(dashboard.series_ended[0].id, ended);
        assert_eq!(dashboard.series_ended[0].item_name, "Mushishi");
        assert_eq!(dashboard.len(), 3);
    }

    #[tokio::test]
    async fn empty_board() {
        let repo = memory_repository().await;
        let board = TaskBoard::new(repo, clock_at("2026-03-10T09:00:00+08:00"));
        assert!(board.dashboard().await.unwrap().is_empty());
        assert!(board.airing_today().await.unwrap().is_empty());
    }

    async fn seed_episodes(repo: &Repository, catalog_id: i64, days: &[u32]) {
        for (index, day) in days.iter().enumerate() {
            let number = index as i32 + 1;
            repo.upsert_episode(NewEpisode {
                catalog_id,
                season: 1,
                episode: number,
                title: format!("Episode {number}"),
                synopsis: String::new(),
                air_date: NaiveDate::from_ymd_opt(2026, 3, *day),
            })
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn airing_today_uses_clock_offset() {
        let repo = memory_repository().await;
        seeded_item(&repo, 209867, "Frieren").await;
        seed_episodes(&repo, 209867, &[9, 10, 11]).await;

        // 2026-03-09T20:00Z is already the 10th in UTC+08:00
        let board = TaskBoard::new(repo, clock_at("2026-03-10T04:00:00+08:00"));
        let today = board.airing_today().await.unwrap();

        assert_eq!(today.len(), 1);
        assert_eq!(today[0].show_name, "Frieren");
        assert_eq!(today[0].episode.episode, 2);
        assert_eq!(today[0].episode.title, "Episode 2");
    }

    #[tokio::test]
    async fn week_runs_monday_to_sunday() {
        let repo = memory_repository().await;
        seeded_item(&repo, 209867, "Frieren").await;
        seeded_item(&repo, 4542, "Mushishi").await;
        // 8th is the Sunday before, 16th the Monday after
        seed_episodes(&repo, 209867, &[8, 9, 12, 16]).await;
        seed_episodes(&repo, 4542, &[12, 15]).await;

        // Tuesday
        let board = TaskBoard::new(repo.clone(), clock_at("2026-03-10T09:00:00+08:00"));
        let week = board.airing_this_week().await.unwrap();

        let dates: Vec<String> = week.iter().map(|day| day.date.to_string()).collect();
        assert_eq!(
            dates,
            vec![
                "2026-03-09", "2026-03-10", "2026-03-11", "2026-03-12", "2026-03-13",
                "2026-03-14", "2026-03-15"
            ]
        );
        let counts: Vec<usize> = week.iter().map(|day| day.episodes.len()).collect();
        assert_eq!(counts, vec![1, 0, 0, 2, 0, 0, 1]);
        assert_eq!(week[6].episodes[0].show_name, "Mushishi");

        // Sunday evening still belongs to the same week
        let board = TaskBoard::new(repo, clock_at("2026-03-15T23:30:00+08:00"));
        let week = board.airing_this_week().await.unwrap();
        assert_eq!(week[0].date, NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
    }
}
