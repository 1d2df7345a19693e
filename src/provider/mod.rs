mod tmdb;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{EpisodeInfo, SearchResult, ShowDocument};

pub use tmdb::{TmdbClient, TMDB_API_URL};

/// Pull source for series metadata. Only the cache refresh path and title
/// search call it; reconciliation never does.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn fetch_document(&self, catalog_id: i64) -> Result<ShowDocument>;

    async fn fetch_episodes(&self, catalog_id: i64, season: i32) -> Result<Vec<EpisodeInfo>>;

    /// Series whose title matches `query`. An empty query returns nothing.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;

    /// Language tag recorded next to cached documents.
    fn language(&self) -> &str;
}
