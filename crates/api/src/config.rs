//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `NOVEL_CART_DATABASE_URL` - SQLite connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `NOVEL_CART_HOST` - Bind address (default: 127.0.0.1)
//! - `NOVEL_CART_PORT` - Listen port (default: 8000)
//! - `NOVEL_CART_BASE_URL` - Public URL, `https://` enables secure cookies
//!   (default: <http://localhost:8000>)
//! - `CART_IDLE_TIMEOUT_SECS` - Anonymous cart idle window (default: 1800)
//! - `CART_PERSIST_AFTER_IDLE` - Keep anonymous cart items past the idle
//!   window (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

/// Default anonymous cart idle window (30 minutes).
pub const DEFAULT_CART_IDLE_TIMEOUT_SECS: i64 = 1800;

/// A variable that is missing or does not parse.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingEnvVar(String),
    #[error("{0} is invalid: {1}")]
    InvalidEnvVar(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// SQLite database connection URL
    pub database_url: SecretString,
    /// Bind address
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the API
    pub base_url: String,
    /// Anonymous cart expiry policy
    pub cart: CartPolicy,
    /// Sentry DSN; error reporting is off when unset
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// How long anonymous carts keep their items between visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartPolicy {
    /// Idle window after which an anonymous cart is emptied.
    pub idle_timeout: chrono::Duration,
    /// When true, anonymous carts are never emptied for inactivity.
    pub persist_after_idle: bool,
}

impl Default for CartPolicy {
    fn default() -> Self {
        Self {
            idle_timeout: chrono::Duration::seconds(DEFAULT_CART_IDLE_TIMEOUT_SECS),
            persist_after_idle: false,
        }
    }
}

impl ApiConfig {
    /// Read the configuration from the environment, after loading `.env`
    /// if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("NOVEL_CART_DATABASE_URL")?;
        let host = parse_env("NOVEL_CART_HOST", "127.0.0.1")?;
        let port = parse_env("NOVEL_CART_PORT", "8000")?;
        let base_url = get_env_or_default("NOVEL_CART_BASE_URL", "http://localhost:8000");
        let cart = CartPolicy::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            cart,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Address the listener binds.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl CartPolicy {
    fn from_env() -> Result<Self, ConfigError> {
        let secs: i64 = parse_env(
            "CART_IDLE_TIMEOUT_SECS",
            &DEFAULT_CART_IDLE_TIMEOUT_SECS.to_string(),
        )?;
        if secs <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CART_IDLE_TIMEOUT_SECS".to_string(),
                "must be a positive number of seconds".to_string(),
            ));
        }
        let persist_after_idle = parse_bool(
            "CART_PERSIST_AFTER_IDLE",
            &get_env_or_default("CART_PERSIST_AFTER_IDLE", "false"),
        )?;

        Ok(Self {
            idle_timeout: chrono::Duration::seconds(secs),
            persist_after_idle,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// A set, non-empty variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a boolean flag, accepting the usual spellings.
fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> ApiConfig {
        ApiConfig {
            database_url: SecretString::from("sqlite::memory:".to_string()),
            host: "127.0.0.1".parse().unwrap(),
            port: 8000,
            base_url: base_url.to_string(),
            cart: CartPolicy::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = config("http://localhost:8000").socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8000);
    }

    #[test]
    fn test_secure_cookies_follow_scheme() {
        assert!(!config("http://localhost:8000").secure_cookies());
        assert!(config("https://novels.example.com").secure_cookies());
    }

    #[test]
    fn test_default_cart_policy_is_thirty_minutes() {
        let policy = CartPolicy::default();
        assert_eq!(policy.idle_timeout.num_seconds(), 1800);
        assert!(!policy.persist_after_idle);
    }

    #[test]
    fn test_parse_bool_spellings() {
        assert!(parse_bool("K", "TRUE").unwrap());
        assert!(parse_bool("K", "on").unwrap());
        assert!(!parse_bool("K", "0").unwrap());
        assert!(matches!(
            parse_bool("K", "maybe"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_database_url_debug_is_redacted() {
        let debug_output = format!("{:?}", config("http://localhost:8000"));
        assert!(!debug_output.contains("sqlite::memory:"));
    }
}
