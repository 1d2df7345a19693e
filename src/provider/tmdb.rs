use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{EpisodeInfo, SearchResult, ShowDocument};

use super::MetadataProvider;

pub const TMDB_API_URL: &str = "https://api.themoviedb.org/3";

// Spacing between requests to stay under TMDB's rate limit
const REQUEST_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    status_code: i64,
    #[serde(default)]
    status_message: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SeasonResponse {
    #[serde(default)]
    episodes: Vec<EpisodeInfo>,
}

pub struct TmdbClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    language: String,
    last_request: Mutex<Option<Instant>>,
}

impl TmdbClient {
    pub fn new(api_key: Option<String>, base_url: &str, language: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("series-tracker/0.1")
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            language: language.to_string(),
            last_request: Mutex::new(None),
        })
    }

    /// API key or v4 read token, with any "Bearer " prefix removed.
    fn token(&self) -> Result<&str> {
        let key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AppError::Config("TMDB API key is not configured".to_string()))?;
        Ok(key.strip_prefix("Bearer ").unwrap_or(key).trim())
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)], token: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))?;
        {
            let mut query = url.query_pairs_mut();
            query.extend_pairs(params);
            query.append_pair("language", &self.language);
            if !uses_bearer_auth(token) {
                query.append_pair("api_key", token);
            }
        }
        Ok(url)
    }

    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < REQUEST_INTERVAL {
                tokio::time::sleep(REQUEST_INTERVAL - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        let token = self.token()?;
        let url = self.endpoint(path, params, token)?;

        self.throttle().await;

        let mut request = self.client.get(url);
        if uses_bearer_auth(token) {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AppError::Provider(format!("failed to decode {}: {}", path, e)))
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    async fn fetch_document(&self, catalog_id: i64) -> Result<ShowDocument> {
        if catalog_id <= 0 {
            return Err(AppError::Provider(format!("invalid TMDB ID: {}", catalog_id)));
        }
        let document: ShowDocument = self.get_json(&format!("/tv/{}", catalog_id), &[]).await?;
        tracing::debug!("Fetched TMDB details for {} ({})", document.name, catalog_id);
        Ok(document)
    }

    async fn fetch_episodes(&self, catalog_id: i64, season: i32) -> Result<Vec<EpisodeInfo>> {
        if catalog_id <= 0 {
            return Err(AppError::Provider(format!("invalid TMDB ID: {}", catalog_id)));
        }
        if season < 0 {
            return Err(AppError::Provider(format!("invalid season number: {}", season)));
        }
        let season: SeasonResponse = self
            .get_json(&format!("/tv/{}/season/{}", catalog_id, season), &[])
            .await?;
        Ok(season.episodes)
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let response: SearchResponse = self.get_json("/search/tv", &[("query", query)]).await?;
        tracing::debug!("TMDB search for {:?} returned {} results", query, response.results.len());
        Ok(response.results)
    }

    fn language(&self) -> &str {
        &self.language
    }
}

/// TMDB v4 read tokens are JWTs and go in the Authorization header; v3 keys go in the query.
fn uses_bearer_auth(token: &str) -> bool {
    token.matches('.').count() >= 2 || token.starts_with("eyJ")
}

fn api_error(status: StatusCode, body: &str) -> AppError {
    match serde_json::from_str::<ApiError>(body) {
        Ok(err) if !err.status_message.is_empty() => {
            let code = if err.status_code == 0 {
                i64::from(status.as_u16())
            } else {
                err.status_code
            };
            AppError::Provider(format!("TMDB API error (code {}): {}", code, err.status_message))
        }
        _ => AppError::Provider(format!("TMDB API error: HTTP {}: {}", status, body)),
    }
}
