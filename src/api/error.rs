//! HTTP error mapping
//!
//! Every failure leaves the service as `{ "error": <code>, "message": <text> }`.

use actix_web::{
    error::{BlockingError, InternalError, JsonPayloadError},
    http::StatusCode,
    HttpRequest, HttpResponse, HttpResponseBuilder, ResponseError,
};
use serde::Serialize;
use serde_json::error::Category;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use crate::admin::AdminError;
use crate::gate::GateError;
use crate::render::RenderError;
use super::middleware::rate_limit::insert_denied_headers;

/// Error body shared by every endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code
    pub error: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("Failed to convert HTML to PDF: {0}")]
    Render(#[from] RenderError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Gate(GateError::Unauthenticated { .. }) => "unauthorized",
            ApiError::Gate(GateError::Forbidden) => "forbidden",
            ApiError::Gate(GateError::RateLimited(_)) => "rate_limit_exceeded",
            ApiError::Gate(GateError::NotConfigured) => "admin_not_configured",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::Render(RenderError::Timeout(_)) => "render_timeout",
            ApiError::Render(_) => "render_failed",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Gate(GateError::Unauthenticated { .. }) => StatusCode::UNAUTHORIZED,
            ApiError::Gate(GateError::Forbidden) => StatusCode::FORBIDDEN,
            ApiError::Gate(GateError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Gate(GateError::NotConfigured) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Render(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponseBuilder::new(self.status_code());
        if let ApiError::Gate(GateError::RateLimited(denial)) = self {
            insert_denied_headers(&mut builder, denial);
        }
        builder.json(ErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
        })
    }
}

impl From<AdminError> for ApiError {
    fn from(e: AdminError) -> Self {
        match e {
            AdminError::BadRequest(msg) => ApiError::BadRequest(msg),
            AdminError::NotFound(prefix) => {
                ApiError::NotFound(format!("No key found with prefix: {}", prefix))
            }
            AdminError::Storage(e) => {
                error!(error = %e, "Key storage failure");
                ApiError::Internal("Failed to update API key store".to_string())
            }
        }
    }
}

impl From<BlockingError> for ApiError {
    fn from(e: BlockingError) -> Self {
        error!(error = %e, "Blocking task failed");
        ApiError::Internal("Internal server error".to_string())
    }
}

/// Maps JSON extractor failures onto 400 / 413
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let api_error = match &err {
        JsonPayloadError::Overflow { limit } | JsonPayloadError::OverflowKnownLength { limit, .. } => {
            ApiError::PayloadTooLarge(format!(
                "Request too large. Maximum size is {}MB",
                limit / (1024 * 1024)
            ))
        }
        // well-formed JSON with wrongly typed fields
        JsonPayloadError::Deserialize(e) if e.classify() == Category::Data => {
            ApiError::BadRequest(format!("Invalid JSON data: {}", e))
        }
        _ => ApiError::BadRequest("No JSON data provided".to_string()),
    };
    InternalError::from_response(err, api_error.error_response()).into()
}

/// Fallback for unknown routes
pub async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::NotFound("Endpoint not found".to_string()))
}
