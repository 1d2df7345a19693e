use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderKind {
    NewEpisode,
    SeriesEnded,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewEpisode => "NEW_EPISODE",
            Self::SeriesEnded => "SERIES_ENDED",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "NEW_EPISODE" => Some(Self::NewEpisode),
            "SERIES_ENDED" => Some(Self::SeriesEnded),
            _ => None,
        }
    }
}

/// A pending or completed action item, joined with its series for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub item_id: i64,
    pub item_name: String,
    pub availability_label: String,
    pub kind: ReminderKind,
    pub description: String,
    pub is_completed: bool,
    pub created_at: DateTime<FixedOffset>,
}

impl Reminder {
    /// Description without the leading `SxxExx|` token, for display.
    pub fn summary(&self) -> &str {
        match self.description.split_once('|') {
            Some((_, text)) => text,
            None => &self.description,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewReminder {
    pub item_id: i64,
    pub kind: ReminderKind,
    pub description: String,
    pub created_at: DateTime<FixedOffset>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder(description: &str) -> Reminder {
        Reminder {
            id: 1,
            item_id: 1,
            item_name: "Severance".to_string(),
            availability_label: "18:00".to_string(),
            kind: ReminderKind::NewEpisode,
            description: description.to_string(),
            is_completed: false,
            created_at: DateTime::parse_from_rfc3339("2026-03-10T09:00:00+08:00").unwrap(),
        }
    }

    #[test]
    fn summary_strips_token_prefix() {
        assert_eq!(
            reminder("S02E03|New episode: S02E03 - Who Is Alive?").summary(),
            "New episode: S02E03 - Who Is Alive?"
        );
        assert_eq!(reminder("legacy S2E3 text").summary(), "legacy S2E3 text");
    }

    #[test]
    fn kind_round_trips_through_db_text() {
        assert_eq!(ReminderKind::from_db("NEW_EPISODE"), Some(ReminderKind::NewEpisode));
        assert_eq!(ReminderKind::from_db("SERIES_ENDED"), Some(ReminderKind::SeriesEnded));
        assert_eq!(ReminderKind::from_db("ORGANIZE"), None);
    }
}
