use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A mirrored installment, keyed by (catalog id, season, episode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub id: i64,
    pub catalog_id: i64,
    pub season: i32,
    pub episode: i32,
    pub title: String,
    pub synopsis: String,
    pub air_date: Option<NaiveDate>,
}

/// A mirrored episode joined with the series it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct AiringEpisode {
    pub show_name: String,
    pub availability_label: String,
    #[serde(flatten)]
    pub episode: EpisodeRecord,
}

#[derive(Debug, Clone)]
pub struct NewEpisode {
    pub catalog_id: i64,
    pub season: i32,
    pub episode: i32,
    pub title: String,
    pub synopsis: String,
    pub air_date: Option<NaiveDate>,
}
