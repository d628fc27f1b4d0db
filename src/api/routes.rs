//! HTTP route handlers and server entry.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::dlq::DeadLetterQueue;
use crate::pipeline::RetryPipeline;
use crate::store::{SharedTaskStore, TaskStore};

use super::tasks;
use super::testing;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: SharedTaskStore,
    /// Dead-letter sink, absent when no directory is configured.
    pub dlq: Option<Arc<DeadLetterQueue>>,
    /// Retry wrapper bound to the dead-letter sink.
    pub pipeline: RetryPipeline,
}

impl AppState {
    /// Assemble application state from configuration.
    pub fn from_config(config: Config) -> anyhow::Result<Arc<Self>> {
        let dlq = DeadLetterQueue::from_config(config.dlq_dir.as_ref())?.map(Arc::new);
        let pipeline = RetryPipeline::new(config.retry, dlq.clone());

        Ok(Arc::new(Self {
            config,
            store: Arc::new(TaskStore::new()),
            dlq,
            pipeline,
        }))
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/tasks", tasks::routes())
        .nest("/test", testing::routes())
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let app = router(Arc::clone(&state));

    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal(state).await;
        })
        .await?;

    Ok(())
}

/// Wait for shutdown signal and flush the dead-letter queue.
async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");

    if let Some(dlq) = &state.dlq {
        if let Err(e) = dlq.finalize().await {
            tracing::error!("Failed to finalize DLQ on shutdown: {}", e);
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Response {
    let dlq_feature = if state.config.dlq_enabled() {
        "enabled"
    } else {
        "disabled"
    };

    state.success(
        StatusCode::OK,
        json!({
            "status": "healthy",
            "environment": state.config.environment,
            "stage": state.config.api_stage,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now(),
            "features": {
                "dlq": dlq_feature,
                "error_handling": "enabled",
            },
        }),
    )
}

/// Fallback for unknown routes.
async fn not_found(State(state): State<Arc<AppState>>) -> Response {
    state.error(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        "Endpoint not found",
        None,
    )
}
