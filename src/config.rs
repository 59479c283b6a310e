use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default port for the sync RPC listener.
pub const DEFAULT_PORT: u16 = 50051;
/// Default number of requests processed concurrently.
pub const DEFAULT_MAX_WORKERS: usize = 10;

/// MongoDB connection settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MongoConfig {
    /// Connection URI. Required when the document store is selected.
    pub uri: Option<String>,
    /// Database holding the per-type collections.
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: "shield".to_string(),
        }
    }
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "shield".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
        }
    }
}

/// Receiver configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Storage backend selector (`mongo`, `postgres` or `postgresql`).
    /// Unset means `mongo`.
    pub database_type: Option<String>,
    pub mongo: MongoConfig,
    pub postgres: PostgresConfig,
    /// Port to listen on
    pub port: u16,
    /// Upper bound on requests handled at the same time
    pub max_workers: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            database_type: None,
            mongo: MongoConfig::default(),
            postgres: PostgresConfig::default(),
            port: DEFAULT_PORT,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl ReceiverConfig {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = config_path
            .or_else(|| std::env::var("RECEIVER_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(Self::default_config_path);
        Self::load_with_env(&path, |key| std::env::var(key).ok())
    }

    /// Load configuration from `path`, reading overrides through `env`.
    pub fn load_with_env<F>(path: &Path, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))?;
        }

        config.apply_env(env)?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = env("DATABASE_TYPE") {
            self.database_type = Some(value);
        }
        if let Some(value) = env("MONGO_URI") {
            self.mongo.uri = Some(value);
        }
        if let Some(value) = env("MONGO_DB") {
            self.mongo.database = value;
        }
        if let Some(value) = env("POSTGRES_HOST") {
            self.postgres.host = value;
        }
        if let Some(value) = env("POSTGRES_PORT") {
            self.postgres.port = parse_env("POSTGRES_PORT", &value)?;
        }
        if let Some(value) = env("POSTGRES_DB") {
            self.postgres.database = value;
        }
        if let Some(value) = env("POSTGRES_USER") {
            self.postgres.user = value;
        }
        if let Some(value) = env("POSTGRES_PASSWORD") {
            self.postgres.password = value;
        }
        if let Some(value) = env("GRPC_PORT") {
            self.port = parse_env("GRPC_PORT", &value)?;
        }
        if let Some(value) = env("RECEIVER_MAX_WORKERS") {
            self.max_workers = parse_env("RECEIVER_MAX_WORKERS", &value)?;
        }
        if self.max_workers == 0 {
            return Err(ConfigError::InvalidValue(
                "max_workers".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Default config file path: <config_dir>/shield-receiver/config.yaml
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shield-receiver")
            .join("config.yaml")
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    ReadError(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    ParseError(PathBuf, #[source] serde_yaml::Error),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
