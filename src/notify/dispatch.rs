//! Concurrent fan-out of one event to all configured channels.
//!
//! Each enabled channel gets its own task, retry budget, and timeout.
//! The join point collects a per-channel outcome rather than a single
//! aggregate flag, so a caller can tell partial failure from total
//! failure. Nothing is shared between channel tasks: one channel's
//! timeout cancels only that channel's future.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::render::render;
use super::retry::RetryConfig;
use super::{Channel, ChannelKind, ChannelTransport, RenderedMessage};
use crate::webhooks::Event;

/// Delivery lifecycle for one (event, channel) pair.
///
/// `Delivered` and `Failed` are terminal; `Retrying` loops back to
/// `Sending` until the retry budget runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Pending,
    Sending,
    Retrying,
    Delivered,
    Failed,
}

impl DeliveryState {
    /// True for states no delivery ever leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryState::Delivered | DeliveryState::Failed)
    }
}

/// Terminal result of one channel's delivery of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum DeliveryOutcome {
    /// The channel accepted the message.
    Delivered { attempts: u32 },

    /// Retries exhausted, or a permanent rejection.
    Failed { attempts: u32, error: String },

    /// The overall per-channel timeout elapsed mid-delivery.
    TimedOut,

    /// Channel disabled, or this event does not notify this channel.
    Skipped,
}

impl DeliveryOutcome {
    /// True if the message reached the channel.
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Attempts delivery on a single channel with retry and backoff.
///
/// Transient errors retry up to the budget; a permanent rejection
/// terminates immediately without consuming the remaining budget.
pub async fn deliver_with_retry(
    transport: &dyn ChannelTransport,
    message: &RenderedMessage,
    retry: &RetryConfig,
) -> DeliveryOutcome {
    let channel = transport.kind();
    let mut state = DeliveryState::Pending;
    debug!(%channel, ?state, "delivery starting");
    let mut attempts = 0u32;

    loop {
        state = DeliveryState::Sending;
        attempts += 1;
        debug!(%channel, ?state, attempts, "delivery attempt");

        match transport.send(message).await {
            Ok(()) => {
                state = DeliveryState::Delivered;
                debug!(%channel, ?state, attempts, "delivery complete");
                return DeliveryOutcome::Delivered { attempts };
            }
            Err(e) if !e.is_retriable() => {
                state = DeliveryState::Failed;
                warn!(%channel, ?state, attempts, error = %e, "permanent delivery failure");
                return DeliveryOutcome::Failed {
                    attempts,
                    error: e.message,
                };
            }
            Err(e) if attempts > retry.max_retries => {
                state = DeliveryState::Failed;
                warn!(%channel, ?state, attempts, error = %e, "delivery retries exhausted");
                return DeliveryOutcome::Failed {
                    attempts,
                    error: e.message,
                };
            }
            Err(e) => {
                state = DeliveryState::Retrying;
                let delay = retry.jittered_delay(attempts - 1);
                debug!(%channel, ?state, attempts, error = %e, delay_ms = delay.as_millis() as u64, "transient delivery failure, backing off");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Fans an event out to every channel, returning per-channel outcomes.
///
/// Channels without a rendered message for this event, and disabled
/// channels, are reported as `Skipped` without any network activity.
/// Each remaining channel delivers inside its own task bounded by
/// `channel_timeout`; a slow or hung channel times out alone and
/// never delays siblings.
pub async fn dispatch(
    event: &Event,
    channels: &[Channel],
    retry: RetryConfig,
    channel_timeout: Duration,
) -> Vec<(ChannelKind, DeliveryOutcome)> {
    let mut outcomes = Vec::with_capacity(channels.len());
    let mut tasks = JoinSet::new();
    let mut task_kinds: HashMap<tokio::task::Id, ChannelKind> = HashMap::new();

    for channel in channels {
        let kind = channel.kind;

        let transport = match (&channel.transport, channel.enabled) {
            (Some(transport), true) => transport.clone(),
            _ => {
                debug!(channel = %kind, event_id = %event.id, "channel disabled, skipping");
                outcomes.push((kind, DeliveryOutcome::Skipped));
                continue;
            }
        };

        let Some(message) = render(event, kind) else {
            debug!(channel = %kind, event_id = %event.id, kind = %event.kind, "event does not notify this channel");
            outcomes.push((kind, DeliveryOutcome::Skipped));
            continue;
        };

        let handle = tasks.spawn(async move {
            let outcome = match tokio::time::timeout(
                channel_timeout,
                deliver_with_retry(transport.as_ref(), &message, &retry),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(channel = %kind, "channel delivery timed out");
                    DeliveryOutcome::TimedOut
                }
            };
            (kind, outcome)
        });
        task_kinds.insert(handle.id(), kind);
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, result)) => outcomes.push(result),
            // A panicking channel task must not take the others down,
            // and its channel still gets a terminal outcome.
            Err(e) => {
                warn!(error = %e, "channel delivery task panicked");
                if let Some(kind) = task_kinds.get(&e.id()).copied() {
                    outcomes.push((
                        kind,
                        DeliveryOutcome::Failed {
                            attempts: 0,
                            error: "delivery task panicked".to_string(),
                        },
                    ));
                }
            }
        }
    }

    outcomes
}
