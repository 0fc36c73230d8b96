//! Success envelope: `{success: true, message?, data}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

/// A successful response body.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    status: StatusCode,
    message: Option<String>,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// `200 OK` with `data`.
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: None,
            data,
        }
    }

    /// `201 Created` with `data`.
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: None,
            data,
        }
    }

    /// Adds a human-readable message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = match self.message {
            Some(message) => json!({ "success": true, "message": message, "data": self.data }),
            None => json!({ "success": true, "data": self.data }),
        };
        (self.status, Json(body)).into_response()
    }
}
