use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use penboard_auth::{AuthzError, PasswordError, TokenError};
use penboard_core::{DomainError, ValidationErrors};
use penboard_infra::StoreError;

/// Errors surfaced by handlers, each mapped to one status code and JSON shape.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Details are logged, never returned to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(errors) => (
                status,
                axum::Json(json!({
                    "error": "validation_error",
                    "message": errors.to_string(),
                    "fields": errors,
                })),
            )
                .into_response(),
            ApiError::MalformedBody(msg) => json_error(status, "malformed_body", msg),
            ApiError::Unauthenticated(msg) => json_error(status, "unauthenticated", msg),
            ApiError::Forbidden(msg) => json_error(status, "forbidden", msg),
            ApiError::NotFound(msg) => json_error(status, "not_found", msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                json_error(status, "internal_error", "internal server error")
            }
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl From<ValidationErrors> for ApiError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Duplicate { fields } => {
                let mut errors = ValidationErrors::new();
                for field in fields {
                    errors.add(field, format!("user with this {} already exists.", field.replace('_', " ")));
                }
                Self::Validation(errors)
            }
            StoreError::NotFound => Self::NotFound("not found".to_string()),
            StoreError::MissingReference(msg) => {
                tracing::warn!(error = %msg, "write referenced a missing row");
                Self::Validation(ValidationErrors::non_field("Referenced object does not exist."))
            }
            StoreError::Backend(msg) => Self::Internal(msg),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Forbidden(msg) => Self::Forbidden(msg),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        match value {
            // Non-numeric path ids never match a row.
            DomainError::InvalidId { entity, .. } => Self::not_found(entity),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(value: PasswordError) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(value: TokenError) -> Self {
        Self::Internal(value.to_string())
    }
}
