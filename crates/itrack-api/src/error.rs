//! API error type and its mapping onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

/// Message for unique-constraint violations that reach the API unclassified.
pub const DUPLICATE_VALUE_MSG: &str = "A record with this value already exists.";
/// Message for foreign-key violations.
pub const MISSING_REFERENCE_MSG: &str = "Referenced record does not exist.";
/// The only message a client ever sees for a 500.
pub const INTERNAL_ERROR_MSG: &str = "Internal Server Error";

const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// One failed field check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    /// 422 with the failing fields; never empty.
    Validation(Vec<FieldError>),
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    /// Detail is logged, not returned.
    Internal(String),
}

impl ApiError {
    /// Single-field validation failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<itrack_core::Error> for ApiError {
    fn from(err: itrack_core::Error) -> Self {
        use itrack_core::Error;

        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::invalid("request", msg),
            Error::InvalidState(msg) => ApiError::BadRequest(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::Database(sqlx::Error::Database(db_err)) => match db_err.code().as_deref() {
                Some(PG_UNIQUE_VIOLATION) => ApiError::Conflict(DUPLICATE_VALUE_MSG.to_string()),
                Some(PG_FOREIGN_KEY_VIOLATION) => {
                    ApiError::BadRequest(MISSING_REFERENCE_MSG.to_string())
                }
                _ => ApiError::Internal(format!("Database error: {}", db_err)),
            },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => {
                let message = errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Validation failed".to_string());
                json!({ "success": false, "message": message, "errors": errors })
            }
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed with internal error");
                json!({ "success": false, "message": INTERNAL_ERROR_MSG })
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => json!({ "success": false, "message": msg }),
        };

        (status, Json(body)).into_response()
    }
}
