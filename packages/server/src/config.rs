//! Server configuration
//!
//! Read from `TREESTAGE_*` environment variables:
//!
//! - `TREESTAGE_PORT` (default 5000)
//! - `TREESTAGE_DB_PATH` (default `~/.treestage/database/treestage.db`)
//! - `TREESTAGE_CORS_ORIGINS` (comma separated, default `http://localhost:4200`)
//! - `TREESTAGE_CASCADE_BATCH_SIZE` (default 64)

use axum::http::HeaderValue;
use std::path::PathBuf;
use treestage_core::{ConfigError, TreeServiceConfig};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:4200";

const PORT_VAR: &str = "TREESTAGE_PORT";
const DB_PATH_VAR: &str = "TREESTAGE_DB_PATH";
const CORS_ORIGINS_VAR: &str = "TREESTAGE_CORS_ORIGINS";
const CASCADE_BATCH_SIZE_VAR: &str = "TREESTAGE_CASCADE_BATCH_SIZE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub cors_origins: Vec<String>,
    pub service: TreeServiceConfig,
}

impl ServerConfig {
    /// Build from the process environment and validate
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup and validate
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(PORT_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::invalid_value(PORT_VAR, raw))?,
            None => DEFAULT_PORT,
        };

        let db_path = match lookup(DB_PATH_VAR) {
            Some(raw) if !raw.trim().is_empty() => PathBuf::from(raw),
            _ => default_db_path()?,
        };

        let cors_origins = match lookup(CORS_ORIGINS_VAR) {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            None => vec![DEFAULT_CORS_ORIGIN.to_string()],
        };

        let mut service = TreeServiceConfig::default();
        if let Some(raw) = lookup(CASCADE_BATCH_SIZE_VAR) {
            service.cascade_batch_size = raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::invalid_value(CASCADE_BATCH_SIZE_VAR, raw))?;
        }

        let config = Self {
            port,
            db_path,
            cors_origins,
            service,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.validate()?;
        for origin in &self.cors_origins {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| ConfigError::invalid_value(CORS_ORIGINS_VAR, origin.clone()))?;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }
}

/// `~/.treestage/database/treestage.db`
pub fn default_db_path() -> Result<PathBuf, ConfigError> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| ConfigError::Missing("home directory for the database path".into()))?;
    Ok(home_dir
        .join(".treestage")
        .join("database")
        .join("treestage.db"))
}
