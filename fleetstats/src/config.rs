//! Process configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::cache::METADATA_TTL;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database URL (e.g. "sqlite:fleetstats.db?mode=rwc").
    pub database_url: String,
    /// Server bind address.
    pub bind_address: String,
    /// Server port.
    pub port: u16,
    /// Enable permissive CORS.
    pub enable_cors: bool,
    /// Directory for rolling log files.
    pub log_dir: PathBuf,
    /// Directory holding the content-addressed image cache.
    pub image_cache_dir: PathBuf,
    /// Optional GeoLite2-City database used when the geo cache misses.
    pub geoip_db_path: Option<PathBuf>,
    /// Freshness window of per-server snapshot data.
    pub metadata_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:fleetstats.db?mode=rwc".to_string(),
            bind_address: "0.0.0.0".to_string(),
            port: 8383,
            enable_cors: true,
            log_dir: PathBuf::from("logs"),
            image_cache_dir: PathBuf::from("cache/images"),
            geoip_db_path: None,
            metadata_ttl: METADATA_TTL,
        }
    }
}

impl AppConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `DATABASE_URL`
    /// - `API_BIND_ADDRESS` / `API_PORT`
    /// - `ENABLE_CORS` (`true`/`false`)
    /// - `LOG_DIR`
    /// - `IMAGE_CACHE_DIR`
    /// - `GEOIP_DB_PATH`
    /// - `METADATA_TTL_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(bind_address) = non_empty("API_BIND_ADDRESS") {
            config.bind_address = bind_address;
        }
        if let Some(port) = non_empty("API_PORT") {
            match port.trim().parse::<u16>() {
                Ok(parsed) => config.port = parsed,
                Err(e) => warn!(value = %port, error = %e, "Ignoring invalid API_PORT"),
            }
        }
        if let Some(cors) = non_empty("ENABLE_CORS") {
            match cors.trim().parse::<bool>() {
                Ok(parsed) => config.enable_cors = parsed,
                Err(e) => warn!(value = %cors, error = %e, "Ignoring invalid ENABLE_CORS"),
            }
        }
        if let Some(dir) = non_empty("LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("IMAGE_CACHE_DIR") {
            config.image_cache_dir = PathBuf::from(dir);
        }
        if let Some(path) = non_empty("GEOIP_DB_PATH") {
            config.geoip_db_path = Some(PathBuf::from(path));
        }
        if let Some(ttl) = non_empty("METADATA_TTL_SECS") {
            match ttl.trim().parse::<u64>() {
                Ok(secs) => config.metadata_ttl = Duration::from_secs(secs),
                Err(e) => warn!(value = %ttl, error = %e, "Ignoring invalid METADATA_TTL_SECS"),
            }
        }

        config
    }
}
