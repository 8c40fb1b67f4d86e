//! Type-safe configuration with validation.
//!
//! Everything is environment-driven; `.env` files are honored in development.

use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid URL format
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl { field: String, reason: String },

    /// Invalid port number
    #[error("Invalid port: must be between 1 and 65535")]
    InvalidPort,

    /// Invalid TTL value
    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),

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
    /// Canonical issuer URI written into every token
    pub issuer_uri: Url,
    /// Audience set stamped on access tokens
    pub default_audience: Vec<String>,
    /// Audience stamped on refresh tokens (this service's own identifier)
    pub service_audience: String,
    /// Access token lifetime in seconds
    pub access_token_ttl_seconds: u64,
    /// Refresh token lifetime in seconds; also the session lifetime
    pub refresh_token_ttl_seconds: u64,
    /// Redis connection URL; absent selects the in-process store
    pub redis_url: Option<String>,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

impl Config {
    /// Loads configuration from environment variables with validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env("PORT", 9000)?,
            issuer_uri: parse_url_env("ISSUER_URI", "http://localhost:9000")?,
            default_audience: parse_list_env_or("DEFAULT_AUDIENCE", &["api-gateway"]),
            service_audience: env::var("SERVICE_AUDIENCE")
                .unwrap_or_else(|_| "auth-server".to_string()),
            access_token_ttl_seconds: parse_env("ACCESS_TOKEN_TTL", 900)?,
            refresh_token_ttl_seconds: parse_env("REFRESH_TOKEN_TTL", 86_400)?,
            redis_url: env::var("REDIS_URL").ok(),
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
        if self.access_token_ttl_seconds == 0 {
            return Err(ConfigError::InvalidTtl(
                "access token TTL must be greater than 0".to_string(),
            ));
        }
        if self.refresh_token_ttl_seconds < self.access_token_ttl_seconds {
            return Err(ConfigError::InvalidTtl(
                "refresh token TTL must not be shorter than the access token TTL".to_string(),
            ));
        }
        if self.service_audience.is_empty() {
            return Err(ConfigError::MissingRequired("service_audience".to_string()));
        }
        if self.default_audience.iter().any(String::is_empty) {
            return Err(ConfigError::MissingRequired("default_audience".to_string()));
        }
        Ok(())
    }

    /// Gets the issuer URI as a string, without a trailing slash.
    #[must_use]
    pub fn issuer_uri_str(&self) -> &str {
        self.issuer_uri.as_str().trim_end_matches('/')
    }

    /// Access token lifetime.
    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_seconds)
    }

    /// Refresh token lifetime.
    #[must_use]
    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_ttl_seconds)
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

/// Parse a URL environment variable with a default value.
fn parse_url_env(name: &str, default: &str) -> Result<Url, ConfigError> {
    let url_str = env::var(name).unwrap_or_else(|_| default.to_string());
    Url::parse(&url_str).map_err(|e| ConfigError::InvalidUrl {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config_base() -> Config {
        Config {
            host: "localhost".to_string(),
            port: 9000,
            issuer_uri: Url::parse("http://localhost:9000").unwrap(),
            default_audience: vec!["api-gateway".to_string()],
            service_audience: "auth-server".to_string(),
            access_token_ttl_seconds: 900,
            refresh_token_ttl_seconds: 86_400,
            redis_url: None,
            shutdown_timeout_seconds: 30,
        }
    }

    #[test]
    fn test_config_validation_invalid_port() {
        let mut config = test_config_base();
        config.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPort)));
    }

    #[test]
    fn test_config_validation_zero_access_ttl() {
        let mut config = test_config_base();
        config.access_token_ttl_seconds = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTtl(_))));
    }

    #[test]
    fn test_config_validation_refresh_shorter_than_access() {
        let mut config = test_config_base();
        config.refresh_token_ttl_seconds = 60;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTtl(_))));
    }

    #[test]
    fn test_config_validation_empty_service_audience() {
        let mut config = test_config_base();
        config.service_audience = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_issuer_uri_str_strips_trailing_slash() {
        let config = test_config_base();
        assert_eq!(config.issuer_uri_str(), "http://localhost:9000");
    }

    #[test]
    fn test_parse_list_env_or_default() {
        let audiences = parse_list_env_or("NONEXISTENT_AUDIENCE_VAR", &["api-gateway"]);
        assert_eq!(audiences, vec!["api-gateway".to_string()]);
    }

    #[test]
    fn test_parse_url_env_invalid() {
        let result = parse_url_env("NONEXISTENT_VAR", "not-a-valid-url");
        assert!(result.is_err());
    }
}
