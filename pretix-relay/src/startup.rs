//! Application startup and lifecycle management.

use crate::config::RelayConfig;
use crate::handlers::{
    health_check, metrics::metrics_endpoint, post_only, receive_webhook, send_test_push,
};
use crate::services::{FcmProvider, MockPushProvider, PushProvider};
use axum::{
    middleware::from_fn,
    routing::{any, get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub push_provider: Arc<dyn PushProvider>,
}

impl AppState {
    /// Build the push provider named by the config: the FCM client, or the
    /// logging mock when dry-run is enabled.
    pub async fn from_config(config: RelayConfig) -> Result<Self, AppError> {
        let push_provider: Arc<dyn PushProvider> = if config.fcm.dry_run {
            tracing::warn!("FCM_DRY_RUN enabled, using mock push provider");
            Arc::new(MockPushProvider::new())
        } else {
            let provider = FcmProvider::from_config(config.fcm.clone()).map_err(|e| {
                tracing::error!("Failed to initialize FCM: {}", e);
                AppError::ConfigError(anyhow::anyhow!("Failed to initialize FCM: {}", e))
            })?;
            tracing::info!(project_id = %config.fcm.project_id, "FCM push provider initialized");
            Arc::new(provider)
        };

        push_provider.health_check().await.map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "{} provider failed its startup check: {}",
                push_provider.name(),
                e
            ))
        })?;

        Ok(Self {
            config,
            push_provider,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(receive_webhook).fallback(post_only))
        .route("/test-fcm", post(send_test_push).fallback(post_only))
        .route("/health", any(health_check))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: RelayConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(config).await?;
        Self::with_state(state).await
    }

    /// Bind the listener for an already-assembled state. Port 0 picks a
    /// random port.
    pub async fn with_state(state: AppState) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "Server bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        tracing::info!("Available endpoints:");
        tracing::info!("  POST /webhook - Pretix webhook handler");
        tracing::info!("  GET  /health - Health check");
        tracing::info!("  POST /test-fcm - Test FCM with device token");

        let router = build_router(self.state);
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
