use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Episode pointer as returned by the metadata provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeInfo {
    #[serde(default)]
    pub air_date: Option<String>,
    pub episode_number: i32,
    pub season_number: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub overview: String,
}

impl EpisodeInfo {
    /// The air date, treating an empty string the same as a missing one.
    pub fn air_date(&self) -> Option<&str> {
        self.air_date
            .as_deref()
            .map(str::trim)
            .filter(|date| !date.is_empty())
    }
}

/// Snapshot of one series from the metadata provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowDocument {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub origin_country: Vec<String>,
    #[serde(default)]
    pub number_of_seasons: i32,
    #[serde(default)]
    pub next_episode_to_air: Option<EpisodeInfo>,
    #[serde(default)]
    pub last_episode_to_air: Option<EpisodeInfo>,
    /// Episodes of the latest season, captured at refresh time so the
    /// reconciliation pass can mirror them without going to the network.
    #[serde(default)]
    pub latest_season_episodes: Vec<EpisodeInfo>,
}

impl ShowDocument {
    pub fn primary_country(&self) -> Option<&str> {
        self.origin_country.first().map(String::as_str)
    }
}

/// One hit from a title search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub origin_country: Vec<String>,
    #[serde(default)]
    pub overview: String,
}

impl SearchResult {
    /// Year of the first air date, if the provider gave one.
    pub fn year(&self) -> Option<&str> {
        self.first_air_date
            .as_deref()
            .and_then(|date| date.get(..4))
            .filter(|year| year.chars().all(|c| c.is_ascii_digit()))
    }
}

/// Raw cache row: one per catalog id, replaced on refresh.
#[derive(Debug, Clone)]
pub struct CachedDocument {
    pub catalog_id: i64,
    pub payload: String,
    pub language: String,
    pub fetched_at: DateTime<FixedOffset>,
}
