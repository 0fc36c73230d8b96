//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use derive_more::{Display, Error};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::services::{ServiceError, ServiceErrorKind};

/// A failed request, rendered as `{success: false, message, ...}`.
#[derive(Debug, Clone, Display, Error)]
#[display("{}", inner)]
pub struct ApiError {
    inner: ServiceError,
    expose: bool,
}

impl ApiError {
    /// Wraps a service error; `expose` adds internal detail to the body.
    pub fn new(inner: ServiceError, expose: bool) -> Self {
        Self { inner, expose }
    }

    /// Replaces the client message of an internal error.
    pub fn context(self, message: impl Into<String>) -> Self {
        Self {
            inner: self.inner.context(message),
            expose: self.expose,
        }
    }

    /// HTTP status for the error kind.
    pub fn status(&self) -> StatusCode {
        match self.inner.kind {
            ServiceErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ServiceErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServiceErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ServiceErrorKind::NotFound => StatusCode::NOT_FOUND,
            ServiceErrorKind::Conflict => StatusCode::CONFLICT,
            ServiceErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(inner: ServiceError) -> Self {
        Self::new(inner, false)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.inner, "Request failed");
        } else {
            debug!(status = status.as_u16(), message = %self.inner.message, "Request rejected");
        }

        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(false));
        body.insert("message".into(), Value::String(self.inner.message));
        if let Some(extra) = self.inner.extra {
            body.extend(extra);
        }
        if self.expose {
            if let Some(detail) = self.inner.detail {
                body.insert("error".into(), Value::String(detail));
            }
        }

        (status, Json(Value::Object(body))).into_response()
    }
}
