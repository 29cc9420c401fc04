//! Success envelope: `{success, message, data?}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 200 with a payload.
pub fn ok<T: Serialize>(message: &str, data: T) -> Response {
    with_status(StatusCode::OK, message, data)
}

/// 201 with the created payload.
pub fn created<T: Serialize>(message: &str, data: T) -> Response {
    with_status(StatusCode::CREATED, message, data)
}

/// 200 without a payload.
pub fn message(message: &str) -> Response {
    let body: Envelope<()> = Envelope {
        success: true,
        message: message.to_string(),
        data: None,
    };
    (StatusCode::OK, Json(body)).into_response()
}

fn with_status<T: Serialize>(status: StatusCode, message: &str, data: T) -> Response {
    let body = Envelope {
        success: true,
        message: message.to_string(),
        data: Some(data),
    };
    (status, Json(body)).into_response()
}
