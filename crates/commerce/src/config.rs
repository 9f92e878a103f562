//! Commerce service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `COMMERCE_DATABASE_URL` - `PostgreSQL` connection string
//! - `COMMERCE_ADMIN_TOKEN` - Shared secret for admin endpoints (min 32 chars, high entropy)
//! - `GATEWAY_BASE_URL` - Payment gateway API base URL
//! - `GATEWAY_API_KEY` - Payment gateway API key
//! - `GATEWAY_WEBHOOK_SECRET` - Shared secret for webhook signatures (min 32 chars)
//!
//! ## Optional
//! - `COMMERCE_HOST` - Bind address (default: 127.0.0.1)
//! - `COMMERCE_PORT` - Listen port (default: 3000)
//! - `COMMERCE_CURRENCY` - Platform currency code, `BOB` or `USD` (default: BOB)
//! - `COMMERCE_LOCK_TIMEOUT_MS` - Bounded wait for stock row locks (default: 5000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Tracing sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};

use altiplano_core::CurrencyCode;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SECRET_LENGTH: usize = 32;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Commerce application configuration.
#[derive(Debug, Clone)]
pub struct CommerceConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shared secret authorizing admin endpoints
    pub admin_token: SecretString,
    /// Platform currency for orders and gateway charges
    pub currency: CurrencyCode,
    /// Bounded wait for stock row locks, in milliseconds
    pub lock_timeout_ms: u64,
    /// Payment gateway configuration
    pub gateway: GatewayConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry tracing sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Payment gateway configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Gateway API base URL (e.g. <https://api.gateway.example>)
    pub base_url: String,
    /// API key sent as a bearer token on outbound calls
    pub api_key: SecretString,
    /// Shared secret verifying inbound webhook signatures
    pub webhook_secret: SecretString,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

impl CommerceConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing, a value
    /// cannot be parsed, or a shared secret fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = SecretString::from(require_env("COMMERCE_DATABASE_URL")?);

        let host = optional_env("COMMERCE_HOST")
            .unwrap_or_else(|| "127.0.0.1".to_string())
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("COMMERCE_HOST".into(), e.to_string()))?;

        let port = optional_env("COMMERCE_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("COMMERCE_PORT".into(), e.to_string()))?;

        let admin_token = require_env("COMMERCE_ADMIN_TOKEN")?;
        validate_secret("COMMERCE_ADMIN_TOKEN", &admin_token)?;

        let currency = match optional_env("COMMERCE_CURRENCY")
            .unwrap_or_else(|| "BOB".to_string())
            .to_uppercase()
            .as_str()
        {
            "BOB" => CurrencyCode::BOB,
            "USD" => CurrencyCode::USD,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "COMMERCE_CURRENCY".into(),
                    format!("unsupported currency: {other}"),
                ));
            }
        };

        let lock_timeout_ms = optional_env("COMMERCE_LOCK_TIMEOUT_MS")
            .unwrap_or_else(|| "5000".to_string())
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("COMMERCE_LOCK_TIMEOUT_MS".into(), e.to_string())
            })?;

        let webhook_secret = require_env("GATEWAY_WEBHOOK_SECRET")?;
        validate_secret("GATEWAY_WEBHOOK_SECRET", &webhook_secret)?;

        let gateway = GatewayConfig {
            base_url: require_env("GATEWAY_BASE_URL")?,
            api_key: SecretString::from(require_env("GATEWAY_API_KEY")?),
            webhook_secret: SecretString::from(webhook_secret),
        };

        let sentry_sample_rate = optional_env("SENTRY_SAMPLE_RATE")
            .unwrap_or_else(|| "1.0".to_string())
            .parse::<f32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SENTRY_SAMPLE_RATE".into(), e.to_string())
            })?;

        let sentry_traces_sample_rate = optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .unwrap_or_else(|| "0.0".to_string())
            .parse::<f32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SENTRY_TRACES_SAMPLE_RATE".into(), e.to_string())
            })?;

        Ok(Self {
            database_url,
            host,
            port,
            admin_token: SecretString::from(admin_token),
            currency,
            lock_timeout_ms,
            gateway,
            sentry_dsn: optional_env("SENTRY_DSN"),
            sentry_environment: optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// The socket address to bind the server to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Constant-time comparison of a presented admin token against the
    /// configured one.
    #[must_use]
    pub fn admin_token_matches(&self, presented: &str) -> bool {
        let expected = self.admin_token.expose_secret();
        if expected.len() != presented.len() {
            return false;
        }
        expected
            .bytes()
            .zip(presented.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

fn require_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Reject secrets that are too short or look like unset placeholders.
fn validate_secret(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.len() < MIN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            name.to_string(),
            format!("must be at least {MIN_SECRET_LENGTH} characters"),
        ));
    }

    let lowered = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lowered.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                name.to_string(),
                format!("contains placeholder pattern '{pattern}'"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_secrets() {
        let result = validate_secret("TEST_TOKEN", "too-short");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn rejects_placeholder_secrets() {
        let result = validate_secret(
            "TEST_TOKEN",
            "changeme-changeme-changeme-changeme-changeme",
        );
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn accepts_high_entropy_secrets() {
        assert!(validate_secret("TEST_TOKEN", "k9Qw3rT7uLpZxCvBnM4hJ2fGdS8aE6yU").is_ok());
    }

    #[test]
    fn admin_token_comparison_requires_exact_match() {
        let config = test_config();
        assert!(config.admin_token_matches("k9Qw3rT7uLpZxCvBnM4hJ2fGdS8aE6yU"));
        assert!(!config.admin_token_matches("k9Qw3rT7uLpZxCvBnM4hJ2fGdS8aE6yV"));
        assert!(!config.admin_token_matches("short"));
    }

    fn test_config() -> CommerceConfig {
        CommerceConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().expect("valid host"),
            port: 3000,
            admin_token: SecretString::from("k9Qw3rT7uLpZxCvBnM4hJ2fGdS8aE6yU"),
            currency: CurrencyCode::BOB,
            lock_timeout_ms: 5000,
            gateway: GatewayConfig {
                base_url: "https://api.gateway.test".to_string(),
                api_key: SecretString::from("gw_k9Qw3rT7uLpZxCvBnM4hJ2fGdS8aE6yU"),
                webhook_secret: SecretString::from("wh_k9Qw3rT7uLpZxCvBnM4hJ2fGdS8aE6yU"),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}
