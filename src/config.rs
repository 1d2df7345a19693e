use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::provider::TMDB_API_URL;

const APP_DIR: &str = "series-tracker";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// v3 API key or v4 read access token.
    pub tmdb_api_key: Option<String>,

    #[serde(default = "default_tmdb_base_url")]
    pub tmdb_base_url: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_sync_interval")]
    pub sync_interval_minutes: u32,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("tracker.db").to_string_lossy().to_string()
}

fn default_tmdb_base_url() -> String {
    TMDB_API_URL.to_string()
}

fn default_language() -> String {
    "zh-CN".to_string()
}

fn default_sync_interval() -> u32 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            tmdb_api_key: None,
            tmdb_base_url: default_tmdb_base_url(),
            language: default_language(),
            sync_interval_minutes: default_sync_interval(),
        }
    }
}

impl Config {
    /// Loads the config file, writing one with defaults on first run.
    /// `TMDB_API_KEY` in the environment wins over the file.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        if let Ok(key) = std::env::var("TMDB_API_KEY") {
            config.apply_api_key_override(key);
        }
        config.validate()?;
        Ok(config)
    }

    fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    fn apply_api_key_override(&mut self, key: String) {
        let key = key.trim();
        if !key.is_empty() {
            self.tmdb_api_key = Some(key.to_string());
        }
    }

    fn validate(&self) -> Result<()> {
        if self.sync_interval_minutes == 0 {
            return Err(AppError::Config(
                "sync_interval_minutes must be at least 1".to_string(),
            ));
        }
        url::Url::parse(&self.tmdb_base_url)?;
        Ok(())
    }
}
