use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::cache::ReadCache;
use crate::db::Database;
use crate::models::Identity;

const DEFAULT_CACHE_TTL_SECS: i64 = 24 * 60 * 60;

/// Settings from the environment (and `.env` if present). CLI flags override.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub cache_path: PathBuf,
    pub user: Option<Identity>,
    pub cache_ttl_secs: i64,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let cache_ttl_secs = match std::env::var("APPTRACK_CACHE_TTL_SECS") {
            Ok(value) => value
                .parse::<i64>()
                .context("APPTRACK_CACHE_TTL_SECS must be a whole number of seconds")?,
            Err(_) => DEFAULT_CACHE_TTL_SECS,
        };

        Ok(Config {
            db_path: std::env::var("APPTRACK_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| Database::default_path()),
            cache_path: std::env::var("APPTRACK_CACHE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| ReadCache::default_path()),
            user: std::env::var("APPTRACK_USER")
                .or_else(|_| std::env::var("USER"))
                .ok()
                .and_then(|u| Identity::new(&u)),
            cache_ttl_secs,
            log_level: std::env::var("APPTRACK_LOG").unwrap_or_else(|_| "warn".to_string()),
        })
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs.max(0))
    }
}
