//! Server configuration loaded from the environment.
//!
//! Every tunable is a named setting, nothing is hard-coded in the
//! pipeline itself. Credentials for a channel are optional: a channel
//! with missing credentials is configured as disabled rather than
//! failing startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default capacity of the bounded event store.
pub const DEFAULT_STORE_CAPACITY: usize = 100;

/// Default backing file for the event store.
pub const DEFAULT_EVENTS_FILE: &str = "github_events.json";

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric setting could not be parsed.
    #[error("invalid value for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
}

/// SMTP settings for the email channel.
///
/// The channel is enabled only when all required fields are present.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP relay hostname (e.g. "smtp.gmail.com").
    pub host: String,

    /// SMTP submission port. Defaults to 587 (STARTTLS).
    pub port: u16,

    /// Username for SMTP AUTH.
    pub user: String,

    /// Password or app password for SMTP AUTH.
    pub password: String,

    /// Sender address. Defaults to the SMTP user.
    pub from: String,

    /// Recipient address for notifications.
    pub recipient: String,
}

/// Complete server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret for webhook signature verification.
    ///
    /// When absent, the server rejects every webhook (fail closed) and
    /// logs a warning at startup.
    pub webhook_secret: Option<Vec<u8>>,

    /// Slack incoming-webhook URL for the chat channel.
    pub slack_webhook_url: Option<String>,

    /// SMTP settings for the email channel.
    pub smtp: Option<SmtpConfig>,

    /// Backing file for the event store.
    pub events_file: PathBuf,

    /// Capacity of the bounded event store.
    pub store_capacity: usize,

    /// Maximum delivery retries per channel (not counting the initial attempt).
    pub delivery_max_retries: u32,

    /// Initial retry backoff.
    pub delivery_initial_backoff: Duration,

    /// Cap on the exponential retry backoff.
    pub delivery_max_backoff: Duration,

    /// Overall per-channel delivery timeout.
    pub delivery_timeout: Duration,

    /// HTTP listen port.
    pub port: u16,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Missing optional settings fall back to defaults; malformed
    /// numeric settings are an error rather than a silent default.
    pub fn from_env() -> Result<Config, ConfigError> {
        let smtp = match (
            env::var("SMTP_USER").ok(),
            env::var("SMTP_PASSWORD").ok(),
            env::var("EMAIL_RECIPIENT").ok(),
        ) {
            (Some(user), Some(password), Some(recipient)) => Some(SmtpConfig {
                host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                port: parse_env("SMTP_PORT", 587)?,
                from: env::var("EMAIL_FROM").unwrap_or_else(|_| user.clone()),
                user,
                password,
                recipient,
            }),
            _ => None,
        };

        Ok(Config {
            webhook_secret: env::var("WEBHOOK_SECRET").ok().map(Vec::from),
            slack_webhook_url: env::var("SLACK_WEBHOOK_URL").ok(),
            smtp,
            events_file: env::var("EVENTS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_EVENTS_FILE)),
            store_capacity: parse_env("EVENT_STORE_CAPACITY", DEFAULT_STORE_CAPACITY)?,
            delivery_max_retries: parse_env("DELIVERY_MAX_RETRIES", 3)?,
            delivery_initial_backoff: Duration::from_millis(parse_env(
                "DELIVERY_INITIAL_BACKOFF_MS",
                500,
            )?),
            delivery_max_backoff: Duration::from_millis(parse_env(
                "DELIVERY_MAX_BACKOFF_MS",
                8_000,
            )?),
            delivery_timeout: Duration::from_secs(parse_env("DELIVERY_TIMEOUT_SECS", 30)?),
            port: parse_env("PORT", 8080)?,
        })
    }
}

/// Parses an environment variable, falling back to a default when unset.
fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(default),
    }
}
