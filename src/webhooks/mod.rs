//! Webhook handling for GitHub events.
//!
//! This module provides:
//! - Signature verification for webhook payloads (HMAC-SHA256)
//! - Classification of raw payloads into canonical [`Event`] records
//!
//! [`Event`]: classify::Event

pub mod classify;
pub mod signature;

pub use classify::{classify, Event, EventId, EventKind, MAX_SUMMARY_LEN};
pub use signature::{compute_signature, format_signature_header, verify_signature};
