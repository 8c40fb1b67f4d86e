//! Type-safe configuration with validation.
//!
//! Everything is environment-driven; `.env` files are honored in development.
//! The issuer, JWKS, and upstream URLs have no sane defaults and are required
//! at process start.

use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Paths served without token validation unless overridden.
pub const DEFAULT_PUBLIC_PATHS: &[&str] = &[
    "/actuator/health",
    "/actuator/info",
    "/public",
    "/auth",
    "/oauth2",
    "/.well-known",
    "/fallback",
    "/metrics",
];

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid URL format
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl { field: String, reason: String },

    /// Invalid port number
    #[error("Invalid port: must be between 1 and 65535")]
    InvalidPort,

    /// Invalid duration or TTL value
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// Invalid public path entry
    #[error("Invalid public path {0:?}: must start with '/'")]
    InvalidPublicPath(String),

    /// Missing required field
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError { name: String, reason: String },
}

/// Service configuration with validation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port (1-65535)
    pub port: u16,
    /// Issuer URI every accepted token must carry in `iss`
    pub issuer_uri: Url,
    /// Where the issuer publishes its key set
    pub jwks_url: Url,
    /// Base URL requests are forwarded to
    pub upstream_url: Url,
    /// Audience every accepted token must carry in `aud`
    pub expected_audience: String,
    /// Path prefixes served without validation
    pub public_paths: Vec<String>,
    /// Key set snapshot lifetime in seconds
    pub jwks_cache_ttl_seconds: u64,
    /// Minimum gap between unknown-kid triggered refreshes, in seconds
    pub jwks_refresh_cooldown_seconds: u64,
    /// Fetch the key set at startup and fail fast when it is unreachable
    pub jwks_prewarm: bool,
    /// Outbound HTTP timeout in seconds
    pub http_timeout_seconds: u64,
    /// Redis connection URL; absent selects the in-process store
    pub redis_url: Option<String>,
    /// Revocation lookup deadline in milliseconds
    pub revocation_timeout_ms: u64,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

impl Config {
    /// Loads configuration from environment variables with validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env("PORT", 8080)?,
            issuer_uri: require_url_env("ISSUER_URI")?,
            jwks_url: require_url_env("JWKS_URL")?,
            upstream_url: require_url_env("UPSTREAM_URL")?,
            expected_audience: env::var("EXPECTED_AUDIENCE")
                .unwrap_or_else(|_| "api-gateway".to_string()),
            public_paths: parse_list_env_or("PUBLIC_PATHS", DEFAULT_PUBLIC_PATHS),
            jwks_cache_ttl_seconds: parse_env("JWKS_CACHE_TTL_SECS", 3600)?,
            jwks_refresh_cooldown_seconds: parse_env("JWKS_REFRESH_COOLDOWN_SECS", 30)?,
            jwks_prewarm: parse_env("JWKS_PREWARM", true)?,
            http_timeout_seconds: parse_env("HTTP_TIMEOUT_SECS", 10)?,
            redis_url: env::var("REDIS_URL").ok(),
            revocation_timeout_ms: parse_env("REVOCATION_TIMEOUT_MS", 500)?,
            shutdown_timeout_seconds: parse_env("SHUTDOWN_TIMEOUT", 30)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.expected_audience.is_empty() {
            return Err(ConfigError::MissingRequired("expected_audience".to_string()));
        }
        if self.jwks_cache_ttl_seconds == 0 {
            return Err(ConfigError::InvalidDuration(
                "key set cache TTL must be greater than 0".to_string(),
            ));
        }
        if self.http_timeout_seconds == 0 {
            return Err(ConfigError::InvalidDuration(
                "HTTP timeout must be greater than 0".to_string(),
            ));
        }
        if self.revocation_timeout_ms == 0 {
            return Err(ConfigError::InvalidDuration(
                "revocation timeout must be greater than 0".to_string(),
            ));
        }
        for path in &self.public_paths {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidPublicPath(path.clone()));
            }
        }
        Ok(())
    }

    /// Gets the issuer URI as a string, without a trailing slash.
    #[must_use]
    pub fn issuer_uri_str(&self) -> &str {
        self.issuer_uri.as_str().trim_end_matches('/')
    }

    /// Key set snapshot lifetime.
    #[must_use]
    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_seconds)
    }

    /// Minimum gap between unknown-kid triggered refreshes.
    #[must_use]
    pub fn jwks_refresh_cooldown(&self) -> Duration {
        Duration::from_secs(self.jwks_refresh_cooldown_seconds)
    }

    /// Outbound HTTP timeout.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    /// Revocation lookup deadline.
    #[must_use]
    pub fn revocation_timeout(&self) -> Duration {
        Duration::from_millis(self.revocation_timeout_ms)
    }

    /// Address the server binds to.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse an environment variable with a default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| ConfigError::ParseError {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Parse a required URL environment variable.
fn require_url_env(name: &str) -> Result<Url, ConfigError> {
    let raw = env::var(name).map_err(|_| ConfigError::MissingRequired(name.to_string()))?;
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
        field: name.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a comma-separated list environment variable, falling back to a default set.
fn parse_list_env_or(name: &str, default: &[&str]) -> Vec<String> {
    match env::var(name) {
        Ok(val) if !val.trim().is_empty() => val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => default.iter().map(|s| (*s).to_string()).collect(),
    }
}
