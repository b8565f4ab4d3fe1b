use config::ConfigError;
use serde::Deserialize;

use crate::error::{AppError, ConfigError as SettingsError};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT signing settings
#[derive(Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,  // seconds (e.g., 3600 for 1 hour)
    pub refresh_token_expiry: i64, // seconds (e.g., 604800 for 7 days)
    pub issuer: String,
}

/// Refresh-token whitelist and cookie delivery settings
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct SessionSettings {
    /// Whitelist records older than this are reclaimed by the sweeper.
    pub retention_days: i64,
    pub sweep_interval_seconds: u64,
    pub cookie_name: String,
    pub cookie_secure: bool,
    /// Max-Age of the cookie set after a federated login; the client is
    /// expected to call the exchange endpoint right away.
    pub federated_cookie_max_age: i64,
    pub federated_redirect_url: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            retention_days: 8,
            sweep_interval_seconds: 24 * 60 * 60,
            cookie_name: "refreshToken".to_string(),
            cookie_secure: false,
            federated_cookie_max_age: 10,
            federated_redirect_url: "http://localhost:5173/cookie".to_string(),
        }
    }
}

impl SessionSettings {
    /// Check the sweep schedule against the refresh-token lifetime.
    ///
    /// The retention window must outlast `refresh_token_expiry` so the sweep
    /// can never remove a token that still verifies.
    ///
    /// # Errors
    /// Returns a config error naming the offending setting
    pub fn validate(&self, refresh_token_expiry: i64) -> Result<(), AppError> {
        if self.sweep_interval_seconds == 0 {
            return Err(SettingsError::InvalidValue(
                "session.sweep_interval_seconds must be positive".to_string(),
            )
            .into());
        }
        if self.retention_days.saturating_mul(SECONDS_PER_DAY) <= refresh_token_expiry {
            return Err(SettingsError::InvalidValue(format!(
                "session.retention_days ({}) must exceed jwt.refresh_token_expiry ({}s)",
                self.retention_days, refresh_token_expiry
            ))
            .into());
        }
        Ok(())
    }
}

/// Loads `configuration.{yaml,json,toml}` from the working directory, then
/// applies `APP_`-prefixed environment overrides (`APP_JWT__SECRET=...`).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
