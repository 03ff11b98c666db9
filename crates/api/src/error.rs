//! API error types with HTTP response mapping.

use adapters::AdapterError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use messagebus::{HandlerError, MessageBusError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The message bus rejected or failed the dispatched message.
    Service(MessageBusError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Service(err) => service_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn service_error_to_response(err: MessageBusError) -> (StatusCode, String) {
    match &err {
        MessageBusError::Handler(handler_err) => match handler_err {
            HandlerError::InvalidSku { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
            HandlerError::UnknownBatch { .. }
            | HandlerError::Domain(DomainError::UnknownBatch { .. }) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            HandlerError::Adapter(AdapterError::ConcurrencyConflict { .. }) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        },
        MessageBusError::MissingCommandHandler { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<MessageBusError> for ApiError {
    fn from(err: MessageBusError) -> Self {
        ApiError::Service(err)
    }
}

impl From<AdapterError> for ApiError {
    fn from(err: AdapterError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
