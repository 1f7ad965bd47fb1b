//! Webhook endpoint handler.
//!
//! Accepts GitHub webhook deliveries, validates signatures over the raw
//! body, classifies and durably appends the event, and returns 202
//! Accepted. Notification fan-out happens out-of-band so a slow channel
//! never delays the response to GitHub.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AppState;
use crate::notify::dispatch;
use crate::webhooks::{classify, verify_signature};

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Errors that can occur when processing a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing required header.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// Invalid or missing signature, or no secret configured.
    ///
    /// Deliberately uniform: the response never distinguishes a wrong
    /// signature from an unconfigured secret.
    #[error("invalid signature")]
    InvalidSignature,

    /// Invalid JSON body.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingHeader(_) => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidJson(_) => StatusCode::BAD_REQUEST,
        };

        (status, self.to_string()).into_response()
    }
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST
/// - Required headers:
///   - `X-GitHub-Event`: Event type (e.g., "push", "workflow_run")
///   - `X-Hub-Signature-256`: HMAC-SHA256 signature of the raw payload
/// - Optional header `X-GitHub-Delivery` is logged when present.
/// - Body: JSON webhook payload
///
/// # Response
///
/// - 202 Accepted: Event classified and appended to the store
/// - 400 Bad Request: Missing event header or invalid JSON
/// - 401 Unauthorized: Invalid signature (or no secret configured)
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let event_type = get_header(&headers, HEADER_EVENT)?;
    let signature_header =
        get_header(&headers, HEADER_SIGNATURE).map_err(|_| WebhookError::InvalidSignature)?;

    if let Some(delivery_id) = headers.get(HEADER_DELIVERY).and_then(|v| v.to_str().ok()) {
        debug!(delivery_id, event_type = %event_type, "received webhook");
    }

    // Verify the signature over the exact raw body BEFORE any parsing.
    // With no secret configured, every delivery is rejected.
    let Some(secret) = app_state.webhook_secret() else {
        warn!("webhook rejected: no signing secret configured");
        return Err(WebhookError::InvalidSignature);
    };
    if !verify_signature(&body, &signature_header, secret) {
        warn!(event_type = %event_type, "invalid webhook signature");
        return Err(WebhookError::InvalidSignature);
    }

    let payload: serde_json::Value = serde_json::from_slice(&body)?;

    let event = classify(&event_type, &payload, Utc::now());
    let event = app_state.store().append(event);

    info!(
        event_id = %event.id,
        kind = %event.kind,
        repository = %event.repository,
        "event accepted"
    );

    // Fan out notifications out-of-band; the webhook response does not
    // wait for channel delivery.
    let channels = app_state.channels().to_vec();
    if !channels.is_empty() {
        let retry = app_state.retry();
        let timeout = app_state.delivery_timeout();
        tokio::spawn(async move {
            let outcomes = dispatch(&event, &channels, retry, timeout).await;
            for (channel, outcome) in &outcomes {
                debug!(event_id = %event.id, %channel, ?outcome, "delivery outcome");
            }
        });
    }

    Ok((StatusCode::ACCEPTED, "Accepted"))
}

/// Extracts a required header value as a string.
fn get_header(headers: &HeaderMap, name: &'static str) -> Result<String, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(WebhookError::MissingHeader(name))
}
