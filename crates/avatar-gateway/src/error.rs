//! Error types for the control API.
//!
//! [`GatewayError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use avatar_core::StateError;
use avatar_types::InvalidDomainValue;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the control API layer.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request body was not valid JSON or lacked a required field.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The value is not a member of its domain.
    #[error(transparent)]
    InvalidDomainValue(#[from] InvalidDomainValue),

    /// The metrics registry could not be built or rendered.
    #[error("metrics error: {0}")]
    Metrics(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StateError> for GatewayError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::InvalidDomainValue(e) => Self::InvalidDomainValue(e),
            StateError::NoRuntime => Self::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedPayload(rejection.body_text())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MalformedPayload(_) | Self::InvalidDomainValue(_) => StatusCode::BAD_REQUEST,
            Self::Metrics(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
