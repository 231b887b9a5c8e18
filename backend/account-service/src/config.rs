//! Configuration management for Account Service
//!
//! Loads settings from:
//! 1. Environment variables
//! 2. .env file (local development)
//!
//! # Example
//!
//! ```no_run
//! use account_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("JWT issuer: {}", settings.jwt.issuer);
//!     Ok(())
//! }
//! ```

use anyhow::{bail, Context, Result};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub shutdown: ShutdownSettings,
    pub worker: WorkerSettings,
}

impl Settings {
    /// Load settings from environment variables (and `.env` in debug builds)
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) && dotenvy::dotenv().is_ok() {
            info!("Loaded .env file for development");
        }

        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        Ok(Settings {
            server: ServerSettings::from_env()?,
            database: DatabaseSettings::from_env()?,
            jwt: JwtSettings::from_env()?,
            shutdown: ShutdownSettings::from_env()?,
            worker: WorkerSettings::from_env()?,
        })
    }
}

/// Parse `key` or fall back to `default`, naming the variable on failure
fn env_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("Invalid {}", key))
}

/// Listener and per-request settings
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub http_port: u16,
    pub grpc_port: u16,
    pub request_timeout: Duration,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env_or("HTTP_PORT", "8080")?,
            grpc_port: env_or("GRPC_PORT", "50051")?,
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT_SECS", "10")?),
        })
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }

    pub fn grpc_addr(&self) -> String {
        format!("{}:{}", self.host, self.grpc_port)
    }
}

/// Database connection settings
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// Unset selects the in-memory store
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout: u64,
}

impl DatabaseSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", "10")?,
            acquire_timeout: env_or("DATABASE_ACQUIRE_TIMEOUT", "5")?,
        })
    }
}

/// Token signing settings
#[derive(Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub algorithm: String,
    pub issuer: String,
    pub expiry_seconds: i64,
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("expiry_seconds", &self.expiry_seconds)
            .finish()
    }
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        Ok(Self {
            secret,
            algorithm: env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string()),
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "account-service".to_string()),
            expiry_seconds: env_or("JWT_EXPIRY_SECONDS", "86400")?,
        })
    }
}

/// Shutdown deadlines
#[derive(Debug, Clone)]
pub struct ShutdownSettings {
    /// HTTP drain deadline
    pub drain_timeout: Duration,
    /// Graceful RPC stop before it is forcibly terminated
    pub force_timeout: Duration,
}

impl ShutdownSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            drain_timeout: Duration::from_secs(env_or("SHUTDOWN_DRAIN_TIMEOUT_SECS", "10")?),
            force_timeout: Duration::from_secs(env_or("SHUTDOWN_FORCE_TIMEOUT_SECS", "5")?),
        })
    }
}

/// Account-count probe settings
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub count_interval: Duration,
    pub count_timeout: Duration,
}

impl WorkerSettings {
    fn from_env() -> Result<Self> {
        let count_interval = Duration::from_secs(env_or("ACCOUNT_COUNT_INTERVAL_SECS", "10")?);
        if count_interval.is_zero() {
            bail!("ACCOUNT_COUNT_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            count_interval,
            count_timeout: Duration::from_secs(env_or("ACCOUNT_COUNT_TIMEOUT_SECS", "5")?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "SERVER_HOST",
        "HTTP_PORT",
        "GRPC_PORT",
        "REQUEST_TIMEOUT_SECS",
        "DATABASE_URL",
        "DATABASE_MAX_CONNECTIONS",
        "DATABASE_ACQUIRE_TIMEOUT",
        "JWT_SECRET",
        "JWT_ALGORITHM",
        "JWT_ISSUER",
        "JWT_EXPIRY_SECONDS",
        "SHUTDOWN_DRAIN_TIMEOUT_SECS",
        "SHUTDOWN_FORCE_TIMEOUT_SECS",
        "ACCOUNT_COUNT_INTERVAL_SECS",
        "ACCOUNT_COUNT_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        env::set_var("JWT_SECRET", "test-secret-key");

        let settings = Settings::from_env().unwrap();

        assert_eq!(settings.server.http_addr(), "0.0.0.0:8080");
        assert_eq!(settings.server.grpc_addr(), "0.0.0.0:50051");
        assert_eq!(settings.server.request_timeout, Duration::from_secs(10));
        assert!(settings.database.url.is_none());
        assert_eq!(settings.jwt.algorithm, "HS256");
        assert_eq!(settings.jwt.issuer, "account-service");
        assert_eq!(settings.jwt.expiry_seconds, 86_400);
        assert_eq!(settings.shutdown.drain_timeout, Duration::from_secs(10));
        assert_eq!(settings.shutdown.force_timeout, Duration::from_secs(5));
        assert_eq!(settings.worker.count_interval, Duration::from_secs(10));
        assert_eq!(settings.worker.count_timeout, Duration::from_secs(5));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        env::set_var("JWT_SECRET", "test-secret-key");
        env::set_var("JWT_ISSUER", "test-issuer");
        env::set_var("JWT_EXPIRY_SECONDS", "7200");
        env::set_var("HTTP_PORT", "9000");
        env::set_var("DATABASE_URL", "postgres://localhost/test");
        env::set_var("SHUTDOWN_FORCE_TIMEOUT_SECS", "1");

        let settings = Settings::from_env().unwrap();

        assert_eq!(settings.jwt.issuer, "test-issuer");
        assert_eq!(settings.jwt.expiry_seconds, 7200);
        assert_eq!(settings.server.http_port, 9000);
        assert_eq!(settings.database.url.as_deref(), Some("postgres://localhost/test"));
        assert_eq!(settings.shutdown.force_timeout, Duration::from_secs(1));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_secret_is_fatal() {
        clear_env();

        let err = Settings::from_env().unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));

        env::set_var("JWT_SECRET", "   ");
        assert!(Settings::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_number_names_variable() {
        clear_env();
        env::set_var("JWT_SECRET", "test-secret-key");
        env::set_var("GRPC_PORT", "not-a-port");

        let err = Settings::from_env().unwrap_err();
        assert_eq!(err.to_string(), "Invalid GRPC_PORT");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_secret_hidden_from_debug() {
        clear_env();
        env::set_var("JWT_SECRET", "very-secret-value");

        let settings = Settings::from_env().unwrap();
        assert!(!format!("{:?}", settings).contains("very-secret-value"));

        clear_env();
    }
}
