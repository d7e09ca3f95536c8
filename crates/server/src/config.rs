//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `BASE_URL` - Public URL for the marketplace API
//! - `SESSION_SECRET` - Session signing secret; must be generated randomness
//!   (32 random bytes base64-encode to 44 characters, the minimum accepted)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `STRIPE_SECRET_KEY` - Stripe API secret key (payments disabled when unset)
//! - `STRIPE_WEBHOOK_SECRET` - Stripe webhook signing secret
//! - `SMTP_HOST` / `SMTP_USERNAME` / `SMTP_PASSWORD` / `SMTP_FROM` - transactional
//!   email delivery (all four together; email disabled when unset)
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - sampling (default 1.0)

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

/// 32 random bytes base64-encode to 44 characters; a shorter session secret
/// cannot carry enough randomness to sign cookies with.
const SESSION_SECRET_MIN_LEN: usize = 44;

/// Provider API keys are opaque tokens; anything this short is a typo.
const API_SECRET_MIN_LEN: usize = 20;

/// A generated secret never gets by on this few distinct characters.
const MIN_DISTINCT_CHARS: usize = 10;

/// Substrings that turn up when someone ships a tutorial value instead of
/// generating a secret. Checked case-insensitively.
const STAND_IN_WORDS: &[&str] = &[
    "changeme",
    "change-me",
    "placeholder",
    "example",
    "sample",
    "dummy",
    "letmein",
    "password",
    "hunter2",
    "qwerty",
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

/// Marketplace server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the marketplace
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Stripe configuration (payments disabled when `None`)
    pub stripe: Option<StripeConfig>,
    /// Email configuration (sending disabled when `None`)
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact the keys.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe API secret key (sk_...)
    pub secret_key: SecretString,
    /// Webhook signing secret (whsec_...); webhook endpoint rejects all
    /// deliveries when unset.
    pub webhook_secret: Option<SecretString>,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or
    /// unparseable, or if a secret fails the sanity checks.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = require("DATABASE_URL").map(SecretString::from)?;
        let host = parse_env("HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?;
        let port = parse_env("PORT", 3000_u16)?;
        let base_url = require("BASE_URL")?;

        let session_secret = require("SESSION_SECRET")?;
        check_secret("SESSION_SECRET", &session_secret, SESSION_SECRET_MIN_LEN)?;
        let session_secret = SecretString::from(session_secret);

        let stripe = StripeConfig::from_env()?;
        let email = EmailConfig::from_env()?;
        let sentry_dsn = optional("SENTRY_DSN");
        let sentry_environment = optional("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = parse_env("SENTRY_SAMPLE_RATE", 1.0_f32)?;
        let sentry_traces_sample_rate = parse_env("SENTRY_TRACES_SAMPLE_RATE", 1.0_f32)?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            stripe,
            email,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns a reference to the Stripe configuration, if available.
    ///
    /// Returns `None` if `STRIPE_SECRET_KEY` was not set, which disables
    /// checkout and receipt lookups.
    #[must_use]
    pub const fn stripe(&self) -> Option<&StripeConfig> {
        self.stripe.as_ref()
    }

    /// Returns a reference to the email configuration, if available.
    ///
    /// Returns `None` if SMTP variables are not set, which disables
    /// transactional email.
    #[must_use]
    pub const fn email(&self) -> Option<&EmailConfig> {
        self.email.as_ref()
    }
}

impl StripeConfig {
    /// Load Stripe configuration from environment.
    ///
    /// Returns `None` if `STRIPE_SECRET_KEY` is not set (payments disabled).
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(secret_key) = optional("STRIPE_SECRET_KEY") else {
            return Ok(None);
        };
        check_secret("STRIPE_SECRET_KEY", &secret_key, API_SECRET_MIN_LEN)?;

        // A weak webhook secret only degrades webhook handling, not
        // checkout, so it warns instead of refusing to boot.
        let webhook_secret = optional("STRIPE_WEBHOOK_SECRET").map(|raw| {
            if let Err(e) = check_secret("STRIPE_WEBHOOK_SECRET", &raw, API_SECRET_MIN_LEN) {
                tracing::warn!("STRIPE_WEBHOOK_SECRET looks weak: {e}");
            }
            SecretString::from(raw)
        });

        Ok(Some(Self {
            secret_key: SecretString::from(secret_key),
            webhook_secret,
        }))
    }
}

impl EmailConfig {
    /// Load email configuration from environment.
    ///
    /// Returns `None` if no SMTP variables are set (email disabled).
    /// The four core variables must be set together.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let smtp_host = optional("SMTP_HOST");
        let smtp_username = optional("SMTP_USERNAME");
        let smtp_password = optional("SMTP_PASSWORD");
        let from_address = optional("SMTP_FROM");

        match (smtp_host, smtp_username, smtp_password, from_address) {
            (Some(host), Some(username), Some(password), Some(from)) => {
                let smtp_port = parse_env("SMTP_PORT", 587_u16)?;

                Ok(Some(Self {
                    smtp_host: host,
                    smtp_port,
                    smtp_username: username,
                    smtp_password: SecretString::from(password),
                    from_address: from,
                }))
            }
            (None, None, None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "SMTP_*".to_string(),
                "SMTP_HOST, SMTP_USERNAME, SMTP_PASSWORD and SMTP_FROM must be set together"
                    .to_string(),
            )),
        }
    }
}

// =============================================================================
// Environment helpers
// =============================================================================

/// A variable that must be present.
fn require(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// A variable that may be absent. Set-but-empty counts as absent, so
/// `FOO=` in a `.env` file doesn't half-enable a feature.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Parse a variable into `T`, falling back to `default` when it is unset.
/// A present-but-unparseable value is an error, not a silent default.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, optional(key), default)
}

fn parse_value<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string())),
        None => Ok(default),
    }
}

/// Refuse secrets that are too short, read like a tutorial stand-in, or
/// repeat a handful of characters. Generated randomness passes all three
/// without trying; human-typed values usually fail at least one.
fn check_secret(name: &str, value: &str, min_len: usize) -> Result<(), ConfigError> {
    if value.len() < min_len {
        return Err(ConfigError::InsecureSecret(
            name.to_owned(),
            format!("shorter than {min_len} characters; generate a longer one"),
        ));
    }

    let lowered = value.to_ascii_lowercase();
    if let Some(word) = STAND_IN_WORDS.iter().find(|word| lowered.contains(*word)) {
        return Err(ConfigError::InsecureSecret(
            name.to_owned(),
            format!("looks like a stand-in value (contains '{word}')"),
        ));
    }

    let distinct = value.chars().collect::<HashSet<_>>().len();
    if distinct < MIN_DISTINCT_CHARS {
        return Err(ConfigError::InsecureSecret(
            name.to_owned(),
            format!("only {distinct} distinct characters; generate a random value"),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn short_secrets_are_refused() {
        let result = check_secret("TEST_VAR", "sk_live_4e", API_SECRET_MIN_LEN);
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn stand_in_values_are_refused() {
        for value in [
            "please-changeme-0192837465",
            "EXAMPLE-key-9f8e7d6c5b4a39",
            "dummy_4f3a9c812b56de70f1a2",
        ] {
            let result = check_secret("TEST_VAR", value, 8);
            assert!(
                matches!(result, Err(ConfigError::InsecureSecret(_, _))),
                "accepted {value:?}"
            );
        }
    }

    #[test]
    fn repetitive_secrets_are_refused() {
        let result = check_secret("TEST_VAR", &"ab".repeat(30), 8);
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn generated_secrets_pass() {
        // Shape of `openssl rand -base64 32` output.
        let value = "qH5vR2mX8kL0wN3pZ7tC1yB6fJ9aD4eS0gU2iO5xQ8c=";
        assert!(check_secret("SESSION_SECRET", value, SESSION_SECRET_MIN_LEN).is_ok());
    }

    #[test]
    fn parse_value_falls_back_only_when_unset() {
        assert_eq!(parse_value("PORT", None, 42_u16).unwrap(), 42);
        assert_eq!(
            parse_value("PORT", Some("8080".to_string()), 42_u16).unwrap(),
            8080
        );
        assert!(matches!(
            parse_value("PORT", Some("not-a-port".to_string()), 42_u16),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }
}
