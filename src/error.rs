use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::models::ResponseEnvelope;
use crate::store::StoreError;

pub const NOT_FOUND_MESSAGE: &str = "Todo not found.";
pub const STORAGE_FAILURE_MESSAGE: &str = "Storage error while processing the request.";

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Error type for the todo endpoints
///
/// Every variant renders as a failure envelope. Validation and lookup
/// failures are the caller's problem (400); storage faults are ours (500).
#[derive(Debug)]
pub enum ApiError {
    /// Required request field missing or empty
    Validation(String),
    /// No todo with this id in the partition
    TodoNotFound(String),
    /// Request body is not valid JSON for a todo request
    JsonError(serde_json::Error),
    /// Storage backend failure, including concurrency conflicts
    Storage(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::TodoNotFound(id) => {
                tracing::info!("Todo not found: {}", id);
                (StatusCode::BAD_REQUEST, NOT_FOUND_MESSAGE.to_string())
            }
            ApiError::JsonError(err) => (
                StatusCode::BAD_REQUEST,
                format!("JSON parse error: {}", err),
            ),
            ApiError::Storage(err) => {
                tracing::error!("Storage failure: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    STORAGE_FAILURE_MESSAGE.to_string(),
                )
            }
        };

        (status, Json(ResponseEnvelope::failure(message))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Storage(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::JsonError(err)
    }
}
