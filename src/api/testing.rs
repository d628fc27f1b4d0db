//! Failure-injection endpoints for exercising the retry and dead-letter
//! paths.
//!
//! `POST /test/error` accepts an `error_type` selector:
//! - `exception` - a terminal failure, dead-lettered with zero retries
//! - `dlq` - records a dead-letter entry directly and reports success
//! - `random` - fails transiently 70% of the time per attempt; the retry
//!   pipeline decides the final disposition

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Response,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::dlq::{DeadLetterEntry, DeadLetterKind};
use crate::pipeline::FailureKind;

use super::routes::AppState;

/// Per-attempt failure probability for the `random` selector.
const RANDOM_FAILURE_RATE: f64 = 0.7;

/// Create test routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/error", post(test_error))
}

#[derive(Debug, Deserialize)]
pub struct TestErrorRequest {
    #[serde(default = "default_error_type")]
    pub error_type: String,
}

fn default_error_type() -> String {
    "exception".to_string()
}

/// A failure manufactured by the test endpoint.
#[derive(Debug, Error)]
enum InjectedFailure {
    #[error("Injected terminal failure")]
    Terminal,
    #[error("Injected transient failure")]
    Transient,
}

fn classify(failure: &InjectedFailure) -> FailureKind {
    match failure {
        InjectedFailure::Terminal => FailureKind::Terminal,
        InjectedFailure::Transient => FailureKind::Transient,
    }
}

/// POST /test/error - Exercise the retry and dead-letter machinery.
async fn test_error(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TestErrorRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(_) => {
            return state.error(
                StatusCode::BAD_REQUEST,
                "INVALID_JSON",
                "Request body must be valid JSON",
                None,
            )
        }
    };

    let payload = json!({ "error_type": req.error_type });

    match req.error_type.as_str() {
        "exception" => {
            let result: Result<(), _> = state
                .pipeline
                .execute(payload, classify, || async {
                    Err(InjectedFailure::Terminal)
                })
                .await;

            // Always dead-lettered; the caller sees a generic failure
            debug_assert!(result.is_err());
            state.error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error occurred",
                None,
            )
        }

        "dlq" => {
            let Some(dlq) = &state.dlq else {
                return state.error(
                    StatusCode::BAD_REQUEST,
                    "DLQ_DISABLED",
                    "DLQ_DIR is not configured",
                    None,
                );
            };

            dlq.record(DeadLetterEntry {
                payload,
                reason: "Manual DLQ test".to_string(),
                kind: DeadLetterKind::Manual,
                attempts: 0,
                first_failure_at: Utc::now(),
            })
            .await;

            state.success(
                StatusCode::OK,
                json!({ "message": "Test message sent to DLQ" }),
            )
        }

        "random" => {
            let result = state
                .pipeline
                .execute(payload, classify, || async {
                    if rand::random::<f64>() < RANDOM_FAILURE_RATE {
                        Err(InjectedFailure::Transient)
                    } else {
                        Ok(())
                    }
                })
                .await;

            match result {
                Ok(()) => state.success(
                    StatusCode::OK,
                    json!({ "message": "Random test passed" }),
                ),
                Err(_) => state.error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error occurred",
                    None,
                ),
            }
        }

        _ => state.error(
            StatusCode::BAD_REQUEST,
            "INVALID_ERROR_TYPE",
            "error_type must be: exception, dlq, or random",
            None,
        ),
    }
}
