use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Lifecycle of a series as reported by the metadata provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowStatus {
    Ongoing,
    Ended,
    Canceled,
    #[default]
    Unknown,
}

impl ShowStatus {
    /// Maps the provider's free-form status ("Returning Series", "Ended", ...).
    pub fn from_provider(status: &str) -> Self {
        match status.trim() {
            "Returning Series" | "In Production" | "Planned" | "Pilot" => Self::Ongoing,
            "Ended" => Self::Ended,
            "Canceled" | "Cancelled" => Self::Canceled,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Ended => "ended",
            Self::Canceled => "canceled",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "ongoing" => Self::Ongoing,
            "ended" => Self::Ended,
            "canceled" => Self::Canceled,
            _ => Self::Unknown,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Ended | Self::Canceled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedItem {
    pub id: i64,
    pub catalog_id: i64,
    pub name: String,
    pub season_count: i32,
    pub status: ShowStatus,
    pub origin_country: String,
    pub availability_label: String,
    pub label_is_manual: bool,
    pub is_archived: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone)]
pub struct NewTrackedItem {
    pub catalog_id: i64,
    pub name: String,
    pub season_count: i32,
    pub status: ShowStatus,
    pub origin_country: String,
    pub availability_label: String,
}
