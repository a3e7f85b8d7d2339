use std::str::FromStr;
use std::time::Duration;

use chemviz_core::ingestion::IngestConfig;
use chemviz_core::retention::RETENTION_CAP;

use crate::auth::jwt::JwtConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Log output format, selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// PostgreSQL URL. When absent, history is kept in memory.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Budget for the persist-and-evict step of one upload.
    pub store_timeout_secs: u64,
    /// Largest accepted upload request body.
    pub max_upload_bytes: usize,
    pub log_format: LogFormat,
    pub jwt: JwtConfig,
}

fn var_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `HOST`                 | `0.0.0.0`               |
    /// | `PORT`                 | `3000`                  |
    /// | `CORS_ORIGINS`         | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                    |
    /// | `DATABASE_URL`         | unset (in-memory)       |
    /// | `DB_MAX_CONNECTIONS`   | `20`                    |
    /// | `STORE_TIMEOUT_SECS`   | `10`                    |
    /// | `MAX_UPLOAD_BYTES`     | `10485760`              |
    /// | `LOG_FORMAT`           | `pretty`                |
    /// | `JWT_SECRET`           | required                |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Ok(Self {
            host,
            port: var_or("PORT", 3000)?,
            cors_origins,
            request_timeout_secs: var_or("REQUEST_TIMEOUT_SECS", 30)?,
            database_url,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 20)?,
            store_timeout_secs: var_or("STORE_TIMEOUT_SECS", 10)?,
            max_upload_bytes: var_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            log_format: var_or("LOG_FORMAT", LogFormat::Pretty)?,
            jwt: JwtConfig::from_env()?,
        })
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            retention_cap: RETENTION_CAP,
            store_timeout: Duration::from_secs(self.store_timeout_secs),
        }
    }
}
