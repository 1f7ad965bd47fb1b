//! AutoPRX - GitHub webhook ingestion with notification fan-out.
//!
//! This library provides the core pipeline: signature verification,
//! event classification, a bounded durable event store, and concurrent
//! delivery to notification channels. It also contains the diff
//! classifier that recommends a PR description template for a change.

pub mod config;
pub mod notify;
pub mod server;
pub mod store;
pub mod templates;
pub mod webhooks;
