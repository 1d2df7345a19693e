use std::sync::Arc;

use chrono::Days;

use crate::clock::Clock;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{NewReminder, Reminder, ReminderKind};

/// Complete and postpone transitions on reminders.
///
/// Each call runs in a single unit of work: on failure nothing it wrote is
/// kept and the error is returned.
pub struct LifecycleService {
    repo: Repository,
    clock: Arc<dyn Clock>,
}

impl LifecycleService {
    pub fn new(repo: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Marks a reminder done. Completing a SERIES_ENDED reminder also
    /// archives its series in the same transaction.
    pub async fn complete(&self, reminder_id: i64) -> Result<Reminder> {
        let now = self.clock.now();
        let reminder = self
            .repo
            .unit_of_work(move |uow| {
                let mut reminder = uow
                    .reminder(reminder_id)?
                    .ok_or_else(|| AppError::not_found("reminder", reminder_id))?;

                uow.complete_reminder(reminder_id)?;
                if reminder.kind == ReminderKind::SeriesEnded {
                    uow.archive_item(reminder.item_id, now)?;
                }

                reminder.is_completed = true;
                Ok(reminder)
            })
            .await?;

        tracing::info!(
            "Completed {} reminder {} for {}",
            reminder.kind.as_str(),
            reminder.id,
            reminder.item_name
        );
        Ok(reminder)
    }

    /// Moves a reminder to the next day by recreating it one calendar day
    /// after its current creation instant, then deleting the original.
    pub async fn postpone(&self, reminder_id: i64) -> Result<Reminder> {
        let reminder = self
            .repo
            .unit_of_work(move |uow| {
                let original = uow
                    .reminder(reminder_id)?
                    .ok_or_else(|| AppError::not_found("reminder", reminder_id))?;

                let due = original
                    .created_at
                    .checked_add_days(Days::new(1))
                    .ok_or_else(|| {
                        AppError::InvalidDate(format!(
                            "cannot postpone past {}",
                            original.created_at
                        ))
                    })?;

                let id = uow.insert_reminder(&NewReminder {
                    item_id: original.item_id,
                    kind: original.kind,
                    description: original.description.clone(),
                    created_at: due,
                })?;
                uow.delete_reminder(original.id)?;

                Ok(Reminder {
                    id,
                    is_completed: false,
                    created_at: due,
                    ..original
                })
            })
            .await?;

        tracing::info!(
            "Postponed reminder {} for {} to {}",
            reminder_id,
            reminder.item_name,
            reminder.created_at
        );
        Ok(reminder)
    }
}
