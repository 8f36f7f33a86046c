//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DUKA_DATABASE_URL` - `PostgreSQL` connection string
//! - `DUKA_BASE_URL` - Public URL for this API
//! - `DUKA_FRONTEND_URL` - Storefront frontend origin (CORS + payment
//!   return/cancel URLs)
//! - `MPESA_CONSUMER_KEY` / `MPESA_CONSUMER_SECRET` - Daraja OAuth credentials
//! - `MPESA_SHORTCODE` - Paybill business short code
//! - `MPESA_PASSKEY` - STK push passkey
//! - `MPESA_CALLBACK_URL` - Public URL the provider posts confirmations to
//! - `PAYPAL_CLIENT_ID` / `PAYPAL_CLIENT_SECRET` - PayPal REST credentials
//!
//! ## Optional
//! - `DUKA_HOST` - Bind address (default: 127.0.0.1)
//! - `DUKA_PORT` - Listen port (default: 3000)
//! - `MPESA_BASE_URL` - Daraja base URL (default: sandbox)
//! - `PAYPAL_BASE_URL` - PayPal base URL (default: sandbox)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_TRACES_SAMPLE_RATE` - Sentry tracing sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for this API
    pub base_url: String,
    /// Storefront frontend origin
    pub frontend_url: String,
    /// M-Pesa (Daraja) configuration
    pub mpesa: MpesaConfig,
    /// PayPal configuration
    pub paypal: PayPalConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Sentry tracing sample rate
    pub sentry_traces_sample_rate: f32,
}

/// M-Pesa (Daraja) API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct MpesaConfig {
    /// Daraja API base URL
    pub base_url: String,
    /// OAuth consumer key
    pub consumer_key: String,
    /// OAuth consumer secret
    pub consumer_secret: SecretString,
    /// Paybill business short code
    pub shortcode: String,
    /// STK push passkey
    pub passkey: SecretString,
    /// Public URL the provider posts confirmations to
    pub callback_url: String,
}

impl std::fmt::Debug for MpesaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpesaConfig")
            .field("base_url", &self.base_url)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("shortcode", &self.shortcode)
            .field("passkey", &"[REDACTED]")
            .field("callback_url", &self.callback_url)
            .finish()
    }
}

/// PayPal REST API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct PayPalConfig {
    /// PayPal API base URL
    pub base_url: String,
    /// REST client id
    pub client_id: String,
    /// REST client secret
    pub client_secret: SecretString,
}

impl std::fmt::Debug for PayPalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("DUKA_DATABASE_URL")?;
        let host = get_env_or_default("DUKA_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("DUKA_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("DUKA_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("DUKA_PORT".to_string(), e.to_string()))?;
        let base_url = get_url_env("DUKA_BASE_URL")?;
        let frontend_url = get_url_env("DUKA_FRONTEND_URL")?;

        let mpesa = MpesaConfig::from_env()?;
        let paypal = PayPalConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_traces_sample_rate = get_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")
            .parse::<f32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SENTRY_TRACES_SAMPLE_RATE".to_string(), e.to_string())
            })?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            frontend_url,
            mpesa,
            paypal,
            sentry_dsn,
            sentry_environment,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl MpesaConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: get_env_or_default("MPESA_BASE_URL", "https://sandbox.safaricom.co.ke"),
            consumer_key: get_required_env("MPESA_CONSUMER_KEY")?,
            consumer_secret: get_required_secret("MPESA_CONSUMER_SECRET")?,
            shortcode: get_required_env("MPESA_SHORTCODE")?,
            passkey: get_required_secret("MPESA_PASSKEY")?,
            callback_url: get_required_env("MPESA_CALLBACK_URL")?,
        })
    }
}

impl PayPalConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: get_env_or_default("PAYPAL_BASE_URL", "https://api-m.sandbox.paypal.com"),
            client_id: get_required_env("PAYPAL_CLIENT_ID")?,
            client_secret: get_required_secret("PAYPAL_CLIENT_SECRET")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by managed
/// postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    // Try primary key first (e.g., DUKA_DATABASE_URL)
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    // Fallback to generic DATABASE_URL
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get a required environment variable that must parse as an absolute URL.
///
/// The trailing slash is trimmed so values compose cleanly with path
/// fragments.
fn get_url_env(key: &str) -> Result<String, ConfigError> {
    let value = get_required_env(key)?;
    Url::parse(&value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(value.trim_end_matches('/').to_string())
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mpesa_config() -> MpesaConfig {
        MpesaConfig {
            base_url: "https://sandbox.safaricom.co.ke".to_string(),
            consumer_key: "key_value".to_string(),
            consumer_secret: SecretString::from("super_secret_consumer"),
            shortcode: "174379".to_string(),
            passkey: SecretString::from("super_secret_passkey"),
            callback_url: "https://api.example.com/api/payments/mpesa/callback".to_string(),
        }
    }

    #[test]
    fn test_socket_addr() {
        let config = ApiConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            mpesa: mpesa_config(),
            paypal: PayPalConfig {
                base_url: "https://api-m.sandbox.paypal.com".to_string(),
                client_id: "client_id".to_string(),
                client_secret: SecretString::from("client_secret"),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_traces_sample_rate: 0.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_mpesa_config_debug_redacts_secrets() {
        let debug_output = format!("{:?}", mpesa_config());

        assert!(debug_output.contains("key_value"));
        assert!(debug_output.contains("174379"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_consumer"));
        assert!(!debug_output.contains("super_secret_passkey"));
    }

    #[test]
    fn test_paypal_config_debug_redacts_secrets() {
        let config = PayPalConfig {
            base_url: "https://api-m.sandbox.paypal.com".to_string(),
            client_id: "client_id_value".to_string(),
            client_secret: SecretString::from("super_secret_client"),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("client_id_value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_client"));
    }
}
