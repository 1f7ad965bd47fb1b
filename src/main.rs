use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autoprx::config::Config;
use autoprx::notify::{channels_from_config, RetryConfig};
use autoprx::server::{build_router, AppState};
use autoprx::store::EventStore;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autoprx=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    if config.webhook_secret.is_none() {
        tracing::warn!(
            "WEBHOOK_SECRET is not set: every webhook delivery will be rejected \
             until a signing secret is configured"
        );
    }

    let store = Arc::new(EventStore::open(
        config.events_file.clone(),
        config.store_capacity,
    ));
    tracing::info!(
        path = %config.events_file.display(),
        capacity = config.store_capacity,
        loaded = store.len(),
        "event store open"
    );

    let channels = channels_from_config(&config);
    for channel in &channels {
        tracing::info!(channel = %channel.kind, enabled = channel.enabled, "notification channel");
    }

    let retry = RetryConfig::from_config(&config);
    let state = AppState::new(
        store,
        config.webhook_secret.clone(),
        channels,
        retry,
        config.delivery_timeout,
    );

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
