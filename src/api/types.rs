//! Standardized response envelopes.
//!
//! Every endpoint responds with the same shape:
//! - success: `{ "success": true, "data": ..., "meta": { ... } }`
//! - error: `{ "success": false, "error": { "code", "message", ... } }`
//!
//! The environment and stage labels ride along in the body metadata and in
//! the `X-Environment` / `X-API-Stage` headers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::routes::AppState;

/// Metadata attached to every successful response.
#[derive(Debug, Serialize)]
pub struct Meta {
    pub environment: String,
    pub stage: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SuccessEnvelope<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub meta: Meta,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
    pub stage: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorDetail,
}

impl AppState {
    /// Build a success response wrapped in the standard envelope.
    pub fn success<T: Serialize>(&self, status: StatusCode, data: T) -> Response {
        let body = SuccessEnvelope {
            success: true,
            data,
            meta: Meta {
                environment: self.config.environment.clone(),
                stage: self.config.api_stage.clone(),
                timestamp: Utc::now(),
            },
        };
        self.with_headers(status, Json(body).into_response())
    }

    /// Build an error response wrapped in the standard envelope.
    pub fn error(
        &self,
        status: StatusCode,
        code: &str,
        message: &str,
        details: Option<serde_json::Value>,
    ) -> Response {
        let body = ErrorEnvelope {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message: message.to_string(),
                details,
                timestamp: Utc::now(),
                environment: self.config.environment.clone(),
                stage: self.config.api_stage.clone(),
            },
        };
        self.with_headers(status, Json(body).into_response())
    }

    fn with_headers(&self, status: StatusCode, mut response: Response) -> Response {
        *response.status_mut() = status;
        let headers = response.headers_mut();
        if let Ok(value) = self.config.environment.parse() {
            headers.insert("x-environment", value);
        }
        if let Ok(value) = self.config.api_stage.parse() {
            headers.insert("x-api-stage", value);
        }
        response
    }
}
