//! HTTP server for webhook ingestion and notification.
//!
//! This module implements the HTTP server that:
//! - Accepts GitHub webhooks, validates signatures, and stores events durably
//! - Serves the recent event history for observability
//! - Serves the PR template catalog and change classification
//! - Provides health checks for liveness probes
//!
//! # Endpoints
//!
//! - `POST /webhook/github` - Accepts GitHub webhook deliveries (returns 202 Accepted)
//! - `GET /events` - Returns the most recent stored events as JSON
//! - `GET /templates` - Returns the PR template catalog
//! - `POST /templates/suggest` - Ranks templates for a described change
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;
use std::time::Duration;

pub mod events;
pub mod health;
pub mod templates;
pub mod webhook;

pub use events::{events_handler, EventView};
pub use health::health_handler;
pub use templates::{suggest_handler, templates_handler};
pub use webhook::webhook_handler;

use crate::notify::{Channel, RetryConfig};
use crate::store::EventStore;

/// Shared application state.
///
/// Passed to all handlers via Axum's `State` extractor. Everything in
/// here is fixed at startup; the event store is the only interior
/// mutability.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Bounded, durable event store.
    store: Arc<EventStore>,

    /// Webhook secret for HMAC-SHA256 signature verification.
    /// `None` means every delivery is rejected.
    webhook_secret: Option<Vec<u8>>,

    /// Notification channels, enabled or disabled, in fan-out order.
    channels: Vec<Channel>,

    /// Retry schedule for channel delivery.
    retry: RetryConfig,

    /// Overall per-channel delivery timeout.
    delivery_timeout: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<EventStore>,
        webhook_secret: Option<Vec<u8>>,
        channels: Vec<Channel>,
        retry: RetryConfig,
        delivery_timeout: Duration,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                store,
                webhook_secret,
                channels,
                retry,
                delivery_timeout,
            }),
        }
    }

    /// Returns the event store.
    pub fn store(&self) -> &EventStore {
        &self.inner.store
    }

    /// Returns the webhook secret, if one is configured.
    pub fn webhook_secret(&self) -> Option<&[u8]> {
        self.inner.webhook_secret.as_deref()
    }

    /// Returns the configured notification channels.
    pub fn channels(&self) -> &[Channel] {
        &self.inner.channels
    }

    /// Returns the delivery retry schedule.
    pub fn retry(&self) -> RetryConfig {
        self.inner.retry
    }

    /// Returns the overall per-channel delivery timeout.
    pub fn delivery_timeout(&self) -> Duration {
        self.inner.delivery_timeout
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook/github", post(webhook_handler))
        .route("/events", get(events_handler))
        .route("/templates", get(templates_handler))
        .route("/templates/suggest", post(suggest_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::webhooks::{compute_signature, format_signature_header};

    /// Creates a test app state with a store in a temporary directory.
    fn test_app_state(secret: Option<&[u8]>) -> (AppState, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = Arc::new(EventStore::open(dir.path().join("events.json"), 100));

        let state = AppState::new(
            store,
            secret.map(|s| s.to_vec()),
            Vec::new(),
            RetryConfig::DEFAULT,
            Duration::from_secs(30),
        );
        (state, dir)
    }

    /// Creates a valid webhook request with proper signature.
    fn create_webhook_request(
        secret: &[u8],
        event_type: &str,
        body: &serde_json::Value,
    ) -> Request<Body> {
        let body_bytes = serde_json::to_vec(body).unwrap();
        let signature = compute_signature(&body_bytes, secret);
        let signature_header = format_signature_header(&signature);

        Request::builder()
            .method("POST")
            .uri("/webhook/github")
            .header("content-type", "application/json")
            .header("x-github-event", event_type)
            .header("x-github-delivery", "550e8400-e29b-41d4-a716-446655440000")
            .header("x-hub-signature-256", signature_header)
            .body(Body::from(body_bytes))
            .unwrap()
    }

    fn push_payload() -> serde_json::Value {
        serde_json::json!({
            "ref": "refs/heads/main",
            "repository": { "full_name": "octocat/hello-world" },
            "pusher": { "name": "octocat" },
            "sender": { "login": "octocat" }
        })
    }

    // ─── Health endpoint tests ───

    #[tokio::test]
    async fn health_returns_200() {
        let (state, _dir) = test_app_state(Some(b"secret"));
        let app = build_router(state);

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    // ─── Webhook endpoint tests ───

    #[tokio::test]
    async fn webhook_valid_returns_202_and_stores_event() {
        let secret = b"test-secret";
        let (state, dir) = test_app_state(Some(secret));
        let app = build_router(state.clone());

        let request = create_webhook_request(secret, "push", &push_payload());
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);

        assert_eq!(state.store().len(), 1);
        let stored = state.store().latest().unwrap();
        assert_eq!(stored.repository, "octocat/hello-world");

        // Durable write-through happened.
        assert!(dir.path().join("events.json").exists());
    }

    #[tokio::test]
    async fn webhook_invalid_signature_returns_401() {
        let (state, _dir) = test_app_state(Some(b"correct-secret"));
        let app = build_router(state.clone());

        // Sign with wrong secret
        let request = create_webhook_request(b"wrong-secret", "push", &push_payload());
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(state.store().is_empty(), "rejected event must not be stored");
    }

    #[tokio::test]
    async fn webhook_without_configured_secret_rejects_everything() {
        let (state, _dir) = test_app_state(None);
        let app = build_router(state.clone());

        let request = create_webhook_request(b"any-secret", "push", &push_payload());
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(state.store().is_empty());
    }

    #[tokio::test]
    async fn webhook_missing_event_header_returns_400() {
        let secret = b"test-secret";
        let (state, _dir) = test_app_state(Some(secret));
        let app = build_router(state);

        let body_bytes = serde_json::to_vec(&push_payload()).unwrap();
        let signature = compute_signature(&body_bytes, secret);

        // Missing x-github-event header
        let request = Request::builder()
            .method("POST")
            .uri("/webhook/github")
            .header("content-type", "application/json")
            .header("x-hub-signature-256", format_signature_header(&signature))
            .body(Body::from(body_bytes))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_malformed_json_returns_400() {
        let secret = b"test-secret";
        let (state, _dir) = test_app_state(Some(secret));
        let app = build_router(state.clone());

        let body_bytes = b"{not json".to_vec();
        let signature = compute_signature(&body_bytes, secret);

        let request = Request::builder()
            .method("POST")
            .uri("/webhook/github")
            .header("content-type", "application/json")
            .header("x-github-event", "push")
            .header("x-hub-signature-256", format_signature_header(&signature))
            .body(Body::from(body_bytes))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.store().is_empty());
    }

    #[tokio::test]
    async fn webhook_unknown_event_kind_is_accepted() {
        let secret = b"test-secret";
        let (state, _dir) = test_app_state(Some(secret));
        let app = build_router(state.clone());

        let request =
            create_webhook_request(secret, "deployment_review", &serde_json::json!({}));
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(state.store().latest().unwrap().kind.as_str(), "other");
    }

    // ─── Event history tests ───

    #[tokio::test]
    async fn events_returns_projected_history() {
        let secret = b"test-secret";
        let (state, _dir) = test_app_state(Some(secret));

        let app = build_router(state.clone());
        let request = create_webhook_request(secret, "push", &push_payload());
        app.oneshot(request).await.unwrap();

        let request = Request::builder()
            .uri("/events")
            .body(Body::empty())
            .unwrap();
        let response = build_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let views: Vec<EventView> = serde_json::from_slice(&body).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].kind, "push");
        assert_eq!(views[0].repository, "octocat/hello-world");
        assert_eq!(views[0].sender, "octocat");
        assert!(views[0].summary.contains("push to octocat/hello-world"));
    }

    #[tokio::test]
    async fn events_respects_limit() {
        let secret = b"test-secret";
        let (state, _dir) = test_app_state(Some(secret));

        for _ in 0..5 {
            let app = build_router(state.clone());
            let request = create_webhook_request(secret, "push", &push_payload());
            app.oneshot(request).await.unwrap();
        }

        let request = Request::builder()
            .uri("/events?limit=2")
            .body(Body::empty())
            .unwrap();
        let response = build_router(state).oneshot(request).await.unwrap();

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let views: Vec<EventView> = serde_json::from_slice(&body).unwrap();
        assert_eq!(views.len(), 2);
    }

    // ─── Template endpoint tests ───

    #[tokio::test]
    async fn templates_lists_the_catalog() {
        let (state, _dir) = test_app_state(Some(b"secret"));
        let app = build_router(state);

        let request = Request::builder()
            .uri("/templates")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: Vec<crate::templates::TemplateView> =
            serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.len(), 7);
        assert!(parsed.iter().any(|t| t.filename == "security.md"));
    }

    #[tokio::test]
    async fn suggest_ranks_security_change_first() {
        let (state, _dir) = test_app_state(Some(b"secret"));
        let app = build_router(state);

        let body = serde_json::json!({
            "changed_paths": ["security/auth.go"],
            "diff_text": "fix CVE-2024-12345 token validation"
        });
        let request = Request::builder()
            .method("POST")
            .uri("/templates/suggest")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["suggestions"][0]["template"], "security.md");
        assert_eq!(parsed["recommended"]["filename"], "security.md");
    }

    #[tokio::test]
    async fn suggest_with_stated_change_type_wins() {
        let (state, _dir) = test_app_state(Some(b"secret"));
        let app = build_router(state);

        let body = serde_json::json!({ "change_type": "docs" });
        let request = Request::builder()
            .method("POST")
            .uri("/templates/suggest")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["recommended"]["filename"], "docs.md");
        // With no paths or diff, the ranked list is the fallback alone.
        assert_eq!(parsed["suggestions"][0]["confidence"], 0.0);
    }
}
