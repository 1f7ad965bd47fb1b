//! Notification fan-out to independent channels.
//!
//! Each classified event can be delivered to zero or more channels
//! (chat webhook, email). Channels are fully isolated: every delivery
//! runs as its own task with its own retry budget and timeout, and a
//! failure on one channel never delays or cancels another. The
//! dispatcher reports a per-channel [`DeliveryOutcome`] so callers can
//! tell partial failure from total failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::config::Config;

pub mod chat;
pub mod dispatch;
pub mod email;
pub mod render;
pub mod retry;

pub use chat::ChatChannel;
pub use dispatch::{dispatch, DeliveryOutcome, DeliveryState};
pub use email::EmailChannel;
pub use render::{render, RenderedMessage};
pub use retry::RetryConfig;

/// The kind of a notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Chat webhook (Slack-style incoming webhook POST).
    Chat,
    /// Email over SMTP.
    Email,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Chat => f.write_str("chat"),
            ChannelKind::Email => f.write_str("email"),
        }
    }
}

/// How a failed delivery attempt should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Worth retrying with backoff (network failure, 5xx, ...).
    Transient,

    /// Definitive rejection; retrying would fail identically
    /// (malformed recipient, 4xx from the webhook endpoint, ...).
    Permanent,
}

/// An error from a single delivery attempt on one channel.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ChannelError {
    /// Whether the attempt may be retried.
    pub kind: ErrorKind,

    /// Human-readable description. Never contains credentials.
    pub message: String,
}

impl ChannelError {
    pub fn transient(message: impl Into<String>) -> ChannelError {
        ChannelError {
            kind: ErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> ChannelError {
        ChannelError {
            kind: ErrorKind::Permanent,
            message: message.into(),
        }
    }

    /// True if the retry loop may attempt this channel again.
    pub fn is_retriable(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

/// Outbound transport for one channel.
///
/// The dispatcher only sees this trait, which keeps the retry and
/// fan-out logic testable against fake transports.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// The kind of channel this transport delivers to.
    fn kind(&self) -> ChannelKind;

    /// Performs one delivery attempt.
    async fn send(&self, message: &RenderedMessage) -> Result<(), ChannelError>;
}

/// A configured notification channel.
///
/// Static after startup: loaded once from [`Config`], read-only
/// thereafter. A channel with missing credentials is kept in the list
/// as disabled so dispatch can report it as skipped.
#[derive(Clone)]
pub struct Channel {
    pub kind: ChannelKind,
    pub enabled: bool,
    pub transport: Option<Arc<dyn ChannelTransport>>,
}

impl Channel {
    /// An enabled channel backed by the given transport.
    pub fn enabled(transport: Arc<dyn ChannelTransport>) -> Channel {
        Channel {
            kind: transport.kind(),
            enabled: true,
            transport: Some(transport),
        }
    }

    /// A disabled placeholder for a channel without credentials.
    pub fn disabled(kind: ChannelKind) -> Channel {
        Channel {
            kind,
            enabled: false,
            transport: None,
        }
    }
}

/// Builds the channel list from configuration.
///
/// A channel whose transport cannot be constructed (bad relay host,
/// bad client config) is logged and configured as disabled rather than
/// failing startup; webhook ingestion continues without it.
pub fn channels_from_config(config: &Config) -> Vec<Channel> {
    let mut channels = Vec::with_capacity(2);

    match &config.slack_webhook_url {
        Some(url) => match ChatChannel::new(url.clone()) {
            Ok(transport) => channels.push(Channel::enabled(Arc::new(transport))),
            Err(e) => {
                warn!(error = %e, "chat channel disabled: client construction failed");
                channels.push(Channel::disabled(ChannelKind::Chat));
            }
        },
        None => channels.push(Channel::disabled(ChannelKind::Chat)),
    }

    match &config.smtp {
        Some(smtp) => match EmailChannel::new(smtp) {
            Ok(transport) => channels.push(Channel::enabled(Arc::new(transport))),
            Err(e) => {
                warn!(error = %e, "email channel disabled: transport construction failed");
                channels.push(Channel::disabled(ChannelKind::Email));
            }
        },
        None => channels.push(Channel::disabled(ChannelKind::Email)),
    }

    channels
}

/// Default timeout for a single outbound HTTP request.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
