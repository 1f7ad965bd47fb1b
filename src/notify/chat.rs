//! Chat channel: Slack-style incoming-webhook POST.
//!
//! Delivery is a single JSON POST of `{"text": ..., "mrkdwn": true}`
//! to the configured webhook URL. 4xx responses are permanent (the
//! URL or payload is wrong, a retry would fail identically), except
//! 429 and 408 which are retried; 5xx and network failures are
//! transient.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

use super::{ChannelError, ChannelKind, ChannelTransport, RenderedMessage, REQUEST_TIMEOUT};

/// Transport posting messages to a chat webhook URL.
pub struct ChatChannel {
    client: reqwest::Client,
    webhook_url: String,
}

impl ChatChannel {
    /// Builds the channel with a request-timeout-bounded HTTP client.
    pub fn new(webhook_url: String) -> Result<ChatChannel, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChannelError::permanent(format!("HTTP client construction: {e}")))?;

        Ok(ChatChannel {
            client,
            webhook_url,
        })
    }

    /// For tests: same channel against an arbitrary URL with a caller-provided client.
    #[cfg(test)]
    fn with_client(client: reqwest::Client, webhook_url: String) -> ChatChannel {
        ChatChannel {
            client,
            webhook_url,
        }
    }
}

#[async_trait]
impl ChannelTransport for ChatChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Chat
    }

    async fn send(&self, message: &RenderedMessage) -> Result<(), ChannelError> {
        let payload = json!({
            "text": message.body,
            "mrkdwn": true,
        });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChannelError::transient(format!("chat webhook request: {e}")))?;

        delivery_result(response.status())
    }
}

/// Maps the webhook's HTTP status to a delivery result.
///
/// 429 and 408 are transient despite being 4xx: the request was fine,
/// the endpoint just wants it later. Other 4xx responses mean the URL
/// or payload is wrong and a retry would fail identically.
fn delivery_result(status: StatusCode) -> Result<(), ChannelError> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT {
        Err(ChannelError::transient(format!(
            "chat webhook rate limited: HTTP {status}"
        )))
    } else if status.is_client_error() {
        Err(ChannelError::permanent(format!(
            "chat webhook rejected delivery: HTTP {status}"
        )))
    } else {
        Err(ChannelError::transient(format!(
            "chat webhook unavailable: HTTP {status}"
        )))
    }
}
