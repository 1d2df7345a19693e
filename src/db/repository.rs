use chrono::{DateTime, FixedOffset, NaiveDate};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::{
    AiringEpisode, CachedDocument, EpisodeRecord, NewEpisode, NewReminder, NewTrackedItem, Reminder,
    ReminderKind, ShowStatus, TrackedItem,
};
use crate::services::matcher;

use super::schema::SCHEMA;
use super::unit_of_work::UnitOfWork;

const ITEM_COLUMNS: &str = "id, catalog_id, name, season_count, status, origin_country, \
     availability_label, label_is_manual, is_archived, created_at, updated_at";

pub(super) const REMINDER_SELECT: &str = r#"SELECT r.id, r.item_id, i.name, i.availability_label, r.kind,
              r.description, r.is_completed, r.created_at
       FROM reminders r
       JOIN tracked_items i ON r.item_id = i.id"#;

const EPISODE_COLUMNS: &str = "id, catalog_id, season, episode, title, synopsis, air_date";

/// Handle to the SQLite store. Cloning shares the same background connection.
#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Runs `work` inside one SQLite transaction.
    ///
    /// The transaction commits only when `work` returns `Ok`; any error rolls
    /// back every statement issued through the [`UnitOfWork`] and is returned
    /// to the caller unchanged.
    pub async fn unit_of_work<F, R>(&self, work: F) -> Result<R>
    where
        F: FnOnce(&UnitOfWork<'_>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let outcome = work(&UnitOfWork::new(&tx));
                if outcome.is_ok() {
                    tx.commit()?;
                }
                Ok(outcome)
            })
            .await?;
        outcome
    }

    // Tracked item operations

    pub async fn insert_item(
        &self,
        item: NewTrackedItem,
        now: DateTime<FixedOffset>,
    ) -> Result<TrackedItem> {
        let stamp = now.to_rfc3339();
        let row = item.clone();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO tracked_items (catalog_id, name, season_count, status, origin_country,
                                                  availability_label, label_is_manual, is_archived,
                                                  created_at, updated_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, ?7, ?7)"#,
                    params![
                        row.catalog_id,
                        row.name,
                        row.season_count,
                        row.status.as_str(),
                        row.origin_country,
                        row.availability_label,
                        stamp,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        Ok(TrackedItem {
            id,
            catalog_id: item.catalog_id,
            name: item.name,
            season_count: item.season_count,
            status: item.status,
            origin_country: item.origin_country,
            availability_label: item.availability_label,
            label_is_manual: false,
            is_archived: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_item(&self, id: i64) -> Result<Option<TrackedItem>> {
        let item = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ITEM_COLUMNS} FROM tracked_items WHERE id = ?1"
                ))?;
                let item = stmt.query_row(params![id], item_from_row).optional()?;
                Ok(item)
            })
            .await?;
        Ok(item)
    }

    pub async fn get_item_by_catalog_id(&self, catalog_id: i64) -> Result<Option<TrackedItem>> {
        let item = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ITEM_COLUMNS} FROM tracked_items WHERE catalog_id = ?1"
                ))?;
                let item = stmt
                    .query_row(params![catalog_id], item_from_row)
                    .optional()?;
                Ok(item)
            })
            .await?;
        Ok(item)
    }

    /// Items that take part in reconciliation.
    pub async fn active_items(&self) -> Result<Vec<TrackedItem>> {
        self.query_items("WHERE is_archived = 0 ORDER BY id").await
    }

    pub async fn all_items(&self) -> Result<Vec<TrackedItem>> {
        self.query_items("ORDER BY name").await
    }

    async fn query_items(&self, clause: &'static str) -> Result<Vec<TrackedItem>> {
        let items = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {ITEM_COLUMNS} FROM tracked_items {clause}"))?;
                let items = stmt
                    .query_map([], item_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?;
        Ok(items)
    }

    /// Writes back the mirrored attributes of an item. The archived flag is
    /// left alone; only the lifecycle cascade and unsubscribe change it.
    pub async fn update_item(&self, item: &TrackedItem, now: DateTime<FixedOffset>) -> Result<()> {
        let id = item.id;
        let item = item.clone();
        let stamp = now.to_rfc3339();
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    r#"UPDATE tracked_items
                       SET name = ?1, season_count = ?2, status = ?3, origin_country = ?4,
                           availability_label = ?5, label_is_manual = ?6, updated_at = ?7
                       WHERE id = ?8"#,
                    params![
                        item.name,
                        item.season_count,
                        item.status.as_str(),
                        item.origin_country,
                        item.availability_label,
                        item.label_is_manual,
                        stamp,
                        item.id,
                    ],
                )?;
                Ok(changed)
            })
            .await?;
        if changed == 0 {
            return Err(AppError::not_found("tracked item", id));
        }
        Ok(())
    }

    /// Sets a manual availability label that inference will no longer overwrite.
    pub async fn set_availability_label(
        &self,
        id: i64,
        label: String,
        now: DateTime<FixedOffset>,
    ) -> Result<()> {
        let stamp = now.to_rfc3339();
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    r#"UPDATE tracked_items
                       SET availability_label = ?1, label_is_manual = 1, updated_at = ?2
                       WHERE id = ?3"#,
                    params![label, stamp, id],
                )?;
                Ok(changed)
            })
            .await?;
        if changed == 0 {
            return Err(AppError::not_found("tracked item", id));
        }
        Ok(())
    }

    // Episode operations

    pub async fn upsert_episode(&self, episode: NewEpisode) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO episodes (catalog_id, season, episode, title, synopsis, air_date)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                       ON CONFLICT(catalog_id, season, episode) DO UPDATE SET
                           title = excluded.title,
                           synopsis = excluded.synopsis,
                           air_date = excluded.air_date"#,
                    params![
                        episode.catalog_id,
                        episode.season,
                        episode.episode,
                        episode.title,
                        episode.synopsis,
                        episode.air_date.map(|date| date.format("%Y-%m-%d").to_string()),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn episodes_for(&self, catalog_id: i64) -> Result<Vec<EpisodeRecord>> {
        let episodes = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {EPISODE_COLUMNS} FROM episodes WHERE catalog_id = ?1 ORDER BY season, episode"
                ))?;
                let episodes = stmt
                    .query_map(params![catalog_id], episode_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(episodes)
            })
            .await?;
        Ok(episodes)
    }

    /// Episodes airing on `date` for series still being followed, with the
    /// series name and availability label joined in.
    pub async fn episodes_airing_on(&self, date: NaiveDate) -> Result<Vec<AiringEpisode>> {
        let day = date.format("%Y-%m-%d").to_string();
        let episodes = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT e.id, e.catalog_id, e.season, e.episode, e.title, e.synopsis, e.air_date,
                              i.name, i.availability_label
                       FROM episodes e
                       JOIN tracked_items i ON i.catalog_id = e.catalog_id
                       WHERE e.air_date = ?1 AND i.is_archived = 0
                       ORDER BY i.availability_label, i.name, e.season, e.episode"#,
                )?;
                let episodes = stmt
                    .query_map(params![day], |row| {
                        Ok(AiringEpisode {
                            episode: episode_from_row(row)?,
                            show_name: row.get(7)?,
                            availability_label: row.get(8)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(episodes)
            })
            .await?;
        Ok(episodes)
    }

    // Reminder operations

    pub async fn insert_reminder(&self, reminder: NewReminder) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| Ok(insert_reminder_row(conn, &reminder)?))
            .await?;
        Ok(id)
    }

    #[cfg(test)]
    pub async fn get_reminder(&self, id: i64) -> Result<Option<Reminder>> {
        let reminder = self
            .conn
            .call(move |conn| Ok(select_reminder(conn, id)?))
            .await?;
        Ok(reminder)
    }

    /// Every NEW_EPISODE reminder of an item, completed or not.
    pub async fn episode_reminders(&self, item_id: i64) -> Result<Vec<Reminder>> {
        let kind = ReminderKind::NewEpisode.as_str();
        let reminders = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{REMINDER_SELECT} WHERE r.item_id = ?1 AND r.kind = ?2 ORDER BY r.id"
                ))?;
                let reminders = stmt
                    .query_map(params![item_id, kind], reminder_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(reminders)
            })
            .await?;
        Ok(reminders)
    }

    /// Looks up the NEW_EPISODE reminder for one episode token of an item.
    pub async fn find_episode_reminder(
        &self,
        item_id: i64,
        token: &str,
    ) -> Result<Option<Reminder>> {
        let candidates = self.episode_reminders(item_id).await?;
        Ok(matcher::find_episode_reminder(token, &candidates).cloned())
    }

    pub async fn has_open_reminder(&self, item_id: i64, kind: ReminderKind) -> Result<bool> {
        let kind = kind.as_str();
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM reminders WHERE item_id = ?1 AND kind = ?2 AND is_completed = 0",
                    params![item_id, kind],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    pub async fn pending_reminders(&self, kind: ReminderKind) -> Result<Vec<Reminder>> {
        let kind = kind.as_str();
        let reminders = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{REMINDER_SELECT} WHERE r.is_completed = 0 AND r.kind = ?1 ORDER BY julianday(r.created_at) DESC, r.id DESC"
                ))?;
                let reminders = stmt
                    .query_map(params![kind], reminder_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(reminders)
            })
            .await?;
        Ok(reminders)
    }

    pub async fn reminders_for_item(&self, item_id: i64) -> Result<Vec<Reminder>> {
        let reminders = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("{REMINDER_SELECT} WHERE r.item_id = ?1 ORDER BY r.id"))?;
                let reminders = stmt
                    .query_map(params![item_id], reminder_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(reminders)
            })
            .await?;
        Ok(reminders)
    }

    // Document cache operations

    pub async fn get_document(&self, catalog_id: i64) -> Result<Option<CachedDocument>> {
        let document = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT catalog_id, payload, language, fetched_at FROM document_cache WHERE catalog_id = ?1",
                )?;
                let document = stmt
                    .query_row(params![catalog_id], document_from_row)
                    .optional()?;
                Ok(document)
            })
            .await?;
        Ok(document)
    }

    pub async fn put_document(&self, document: CachedDocument) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO document_cache (catalog_id, payload, language, fetched_at)
                       VALUES (?1, ?2, ?3, ?4)
                       ON CONFLICT(catalog_id) DO UPDATE SET
                           payload = excluded.payload,
                           language = excluded.language,
                           fetched_at = excluded.fetched_at"#,
                    params![
                        document.catalog_id,
                        document.payload,
                        document.language,
                        document.fetched_at.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn execute_batch(&self, sql: &'static str) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute_batch(sql)?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

pub(super) fn select_reminder(
    conn: &rusqlite::Connection,
    id: i64,
) -> rusqlite::Result<Option<Reminder>> {
    let mut stmt = conn.prepare(&format!("{REMINDER_SELECT} WHERE r.id = ?1"))?;
    stmt.query_row(params![id], reminder_from_row).optional()
}

pub(super) fn insert_reminder_row(
    conn: &rusqlite::Connection,
    reminder: &NewReminder,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO reminders (item_id, kind, description, is_completed, created_at) VALUES (?1, ?2, ?3, 0, ?4)",
        params![
            reminder.item_id,
            reminder.kind.as_str(),
            reminder.description,
            reminder.created_at.to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(super) fn archive_item_row(
    conn: &rusqlite::Connection,
    id: i64,
    stamp: &str,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE tracked_items SET is_archived = 1, updated_at = ?1 WHERE id = ?2",
        params![stamp, id],
    )
}

// Every timestamp is written as RFC 3339 with its offset. Anything else is
// corrupt rather than a second format to guess at.
fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

fn datetime_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<FixedOffset>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp: {raw}").into(),
        )
    })
}

fn item_from_row(row: &Row) -> rusqlite::Result<TrackedItem> {
    Ok(TrackedItem {
        id: row.get(0)?,
        catalog_id: row.get(1)?,
        name: row.get(2)?,
        season_count: row.get(3)?,
        status: ShowStatus::from_db(&row.get::<_, String>(4)?),
        origin_country: row.get(5)?,
        availability_label: row.get(6)?,
        label_is_manual: row.get(7)?,
        is_archived: row.get(8)?,
        created_at: datetime_column(row, 9)?,
        updated_at: datetime_column(row, 10)?,
    })
}

fn episode_from_row(row: &Row) -> rusqlite::Result<EpisodeRecord> {
    Ok(EpisodeRecord {
        id: row.get(0)?,
        catalog_id: row.get(1)?,
        season: row.get(2)?,
        episode: row.get(3)?,
        title: row.get(4)?,
        synopsis: row.get(5)?,
        air_date: row
            .get::<_, Option<String>>(6)?
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
    })
}

pub(super) fn reminder_from_row(row: &Row) -> rusqlite::Result<Reminder> {
    let kind: String = row.get(4)?;
    let kind = ReminderKind::from_db(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown reminder kind: {kind}").into(),
        )
    })?;
    Ok(Reminder {
        id: row.get(0)?,
        item_id: row.get(1)?,
        item_name: row.get(2)?,
        availability_label: row.get(3)?,
        kind,
        description: row.get(5)?,
        is_completed: row.get(6)?,
        created_at: datetime_column(row, 7)?,
    })
}

fn document_from_row(row: &Row) -> rusqlite::Result<CachedDocument> {
    Ok(CachedDocument {
        catalog_id: row.get(0)?,
        payload: row.get(1)?,
        language: row.get(2)?,
        fetched_at: datetime_column(row, 3)?,
    })
}
