//! # configs
//!
//! Layered runtime settings: built-in defaults, then an optional
//! `config/barter.{toml,yaml,json}` file, then `BARTER__SECTION__KEY`
//! environment variables. Binaries call [`load_env_file`] first so a `.env`
//! file can feed the environment layer.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, SettingsError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| SettingsError::Invalid(format!("server address: {e}")))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub backend: StorageBackend,
    pub url: Option<SecretString>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: SecretString,
    pub token_ttl_secs: u64,
    pub issuer: String,
}

impl AuthSettings {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationSettings {
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset
    pub filter: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub pagination: PaginationSettings,
    pub log: LogSettings,
}

impl Settings {
    /// Reads the optional config file and the environment.
    pub fn load() -> Result<Self, SettingsError> {
        let builder = builder()?
            .add_source(File::with_name("config/barter").required(false))
            .add_source(
                Environment::with_prefix("BARTER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::from_builder(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.auth.jwt_secret.expose_secret().len() < MIN_JWT_SECRET_LEN {
            return Err(SettingsError::Invalid(format!(
                "auth.jwt_secret must be at least {MIN_JWT_SECRET_LEN} bytes"
            )));
        }
        if self.auth.token_ttl_secs == 0 {
            return Err(SettingsError::Invalid(
                "auth.token_ttl_secs must be positive".into(),
            ));
        }
        if self.pagination.page_size == 0 {
            return Err(SettingsError::Invalid(
                "pagination.page_size must be positive".into(),
            ));
        }
        if self.database.backend == StorageBackend::Postgres {
            let missing = self
                .database
                .url
                .as_ref()
                .is_none_or(|url| url.expose_secret().trim().is_empty());
            if missing {
                return Err(SettingsError::Invalid(
                    "database.url is required for the postgres backend".into(),
                ));
            }
            if self.database.max_connections == 0 {
                return Err(SettingsError::Invalid(
                    "database.max_connections must be positive".into(),
                ));
            }
        }
        self.server.socket_addr()?;
        Ok(())
    }
}

/// Defaults for every key except the secrets.
pub fn builder() -> Result<ConfigBuilder<DefaultState>, SettingsError> {
    Ok(Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8000)?
        .set_default("database.backend", "postgres")?
        .set_default("database.max_connections", 10)?
        .set_default("auth.token_ttl_secs", 3600)?
        .set_default("auth.issuer", "barter")?
        .set_default("pagination.page_size", 10)?
        .set_default("log.filter", "info,sqlx=warn,tower_http=info")?
        .set_default("log.format", "pretty")?)
}

/// Loads `.env` into the process environment. A missing file is fine; any
/// other failure is returned so it can be logged once a subscriber is up.
pub fn load_env_file() -> Result<Option<PathBuf>, dotenvy::Error> {
    skip_missing(dotenvy::dotenv())
}

fn skip_missing(
    result: Result<PathBuf, dotenvy::Error>,
) -> Result<Option<PathBuf>, dotenvy::Error> {
    match result {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
