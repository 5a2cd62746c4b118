//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::{Duration as ChronoDuration, Utc};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

use crate::appearance::AuthUiConfig;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which adapter backs the identity and record-store ports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("'{}' is not one of postgres, memory", other)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub log_level: Level,
    pub session_ttl: ChronoDuration,
    pub gate_delay: Duration,
    pub gate_timeout: Duration,
    pub copy_confirmation: Duration,
    pub cors_origin: String,
    pub auth_ui: AuthUiConfig,
}

impl Default for Config {
    /// Development defaults: in-memory store, no `.env` lookups.
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            store_backend: StoreBackend::Memory,
            database_url: None,
            log_level: Level::INFO,
            session_ttl: ChronoDuration::days(30),
            gate_delay: Duration::from_millis(1000),
            gate_timeout: Duration::from_millis(30_000),
            copy_confirmation: Duration::from_millis(2000),
            cors_origin: "http://localhost:3000".to_string(),
            auth_ui: AuthUiConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Store Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let store_backend = std::env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse::<StoreBackend>()
            .map_err(|e| ConfigError::InvalidValue("STORE_BACKEND".to_string(), e))?;

        let database_url = std::env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingVar("DATABASE_URL".to_string()));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Session and Gate Timings ---
        let session_ttl = session_ttl_from_days(parse_number("SESSION_TTL_DAYS", 30)?)?;
        let gate_delay = Duration::from_millis(parse_number("GATE_DELAY_MS", 1000)?);
        let gate_timeout = Duration::from_millis(parse_number("GATE_TIMEOUT_MS", 30_000)?);
        let copy_confirmation = Duration::from_millis(parse_number("COPY_CONFIRMATION_MS", 2000)?);
        if gate_timeout <= gate_delay {
            return Err(ConfigError::InvalidValue(
                "GATE_TIMEOUT_MS".to_string(),
                "must be longer than GATE_DELAY_MS".to_string(),
            ));
        }

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load the Sign-in Form Appearance ---
        let auth_ui = match std::env::var("AUTH_UI_CONFIG").map(PathBuf::from) {
            Ok(path) => AuthUiConfig::from_file(&path)?,
            Err(_) => AuthUiConfig::default(),
        };

        Ok(Self {
            bind_address,
            store_backend,
            database_url,
            log_level,
            session_ttl,
            gate_delay,
            gate_timeout,
            copy_confirmation,
            cors_origin,
            auth_ui,
        })
    }
}

/// Longest session the identity provider is asked to issue.
const MAX_SESSION_TTL_DAYS: i64 = 3650;

/// Converts `SESSION_TTL_DAYS` into a duration that every later
/// `now + ttl` expiry computation can represent.
fn session_ttl_from_days(days: i64) -> Result<ChronoDuration, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue("SESSION_TTL_DAYS".to_string(), reason);
    if days > MAX_SESSION_TTL_DAYS {
        return Err(invalid(format!("{} exceeds the maximum of {} days", days, MAX_SESSION_TTL_DAYS)));
    }
    let ttl = ChronoDuration::try_days(days)
        .ok_or_else(|| invalid(format!("{} days is out of range", days)))?;
    Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| invalid(format!("{} days overflows the session expiry", days)))?;
    Ok(ttl)
}

/// Reads a non-negative integer variable, falling back to `default` when unset.
fn parse_number<T: FromStr + Default + PartialOrd>(var: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => {
            let value = raw
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string()))?;
            if value <= T::default() {
                return Err(ConfigError::InvalidValue(
                    var.to_string(),
                    format!("'{}' must be greater than zero", raw),
                ));
            }
            Ok(value)
        }
        Err(_) => Ok(default),
    }
}
