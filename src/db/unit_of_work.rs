use chrono::{DateTime, FixedOffset};
use rusqlite::params;

use crate::error::{AppError, Result};
use crate::models::{NewReminder, Reminder};

use super::repository::{archive_item_row, insert_reminder_row, select_reminder};

/// Statements available inside a [`Repository::unit_of_work`] transaction.
///
/// [`Repository::unit_of_work`]: super::Repository::unit_of_work
pub struct UnitOfWork<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> UnitOfWork<'a> {
    pub(super) fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn reminder(&self, id: i64) -> Result<Option<Reminder>> {
        Ok(select_reminder(self.conn, id)?)
    }

    pub fn complete_reminder(&self, id: i64) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE reminders SET is_completed = 1 WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(AppError::not_found("reminder", id));
        }
        Ok(())
    }

    pub fn archive_item(&self, item_id: i64, now: DateTime<FixedOffset>) -> Result<()> {
        let changed = archive_item_row(self.conn, item_id, &now.to_rfc3339())?;
        if changed == 0 {
            return Err(AppError::not_found("tracked item", item_id));
        }
        Ok(())
    }

    pub fn insert_reminder(&self, reminder: &NewReminder) -> Result<i64> {
        Ok(insert_reminder_row(self.conn, reminder)?)
    }

    pub fn delete_episodes(&self, catalog_id: i64) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM episodes WHERE catalog_id = ?1",
            params![catalog_id],
        )?)
    }

    pub fn delete_reminder(&self, id: i64) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM reminders WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(AppError::not_found("reminder", id));
        }
        Ok(())
    }
}
