//! Business-operation error type.

use derive_more::{Display, Error};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::auth::{AuthError, AuthErrorKind};
use crate::db::{DbError, DbErrorKind};

/// Category of a failed operation, one per client-visible outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// Input failed validation or a business rule.
    BadRequest,
    /// No credentials were presented, or they did not match.
    Unauthenticated,
    /// Credentials are invalid or lack the needed role.
    Forbidden,
    /// The referenced entity does not exist.
    NotFound,
    /// The write collides with existing data.
    Conflict,
    /// Unexpected failure.
    Internal,
}

/// Service error with a client-facing message and optional detail.
#[derive(Debug, Clone, Display, Error)]
#[display("{}: {} at {}:{}", kind_label(kind), message, file, line)]
pub struct ServiceError {
    /// Error category.
    pub kind: ServiceErrorKind,
    /// Message safe to show to clients.
    pub message: String,
    /// Internal detail, shown to clients only when configured.
    pub detail: Option<String>,
    /// Extra top-level fields for the error body.
    pub extra: Option<Map<String, Value>>,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

fn kind_label(kind: &ServiceErrorKind) -> &'static str {
    match kind {
        ServiceErrorKind::BadRequest => "Bad request",
        ServiceErrorKind::Unauthenticated => "Unauthenticated",
        ServiceErrorKind::Forbidden => "Forbidden",
        ServiceErrorKind::NotFound => "Not found",
        ServiceErrorKind::Conflict => "Conflict",
        ServiceErrorKind::Internal => "Internal error",
    }
}

impl ServiceError {
    #[track_caller]
    fn build(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            detail: None,
            extra: None,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Invalid input (400).
    #[track_caller]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::build(ServiceErrorKind::BadRequest, message)
    }

    /// Missing or mismatched credentials (401).
    #[track_caller]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::build(ServiceErrorKind::Unauthenticated, message)
    }

    /// Invalid token or insufficient role (403).
    #[track_caller]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::build(ServiceErrorKind::Forbidden, message)
    }

    /// Unknown entity (404).
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::build(ServiceErrorKind::NotFound, message)
    }

    /// Conflicting write (409).
    #[track_caller]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::build(ServiceErrorKind::Conflict, message)
    }

    /// Unexpected failure (500) carrying internal detail.
    #[track_caller]
    #[instrument(skip(message, detail))]
    pub fn internal(message: impl Into<String>, detail: impl Into<String>) -> Self {
        let mut err = Self::build(ServiceErrorKind::Internal, message);
        err.detail = Some(detail.into());
        warn!(detail = ?err.detail, "Internal service error");
        err
    }

    /// Attaches extra top-level fields to the error body.
    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Replaces the client-facing message of an internal error, keeping detail.
    pub fn context(mut self, message: impl Into<String>) -> Self {
        if self.kind == ServiceErrorKind::Internal {
            self.message = message.into();
        }
        self
    }
}

impl From<DbError> for ServiceError {
    #[track_caller]
    fn from(err: DbError) -> Self {
        match err.kind {
            DbErrorKind::NotFound => Self::not_found(err.message),
            DbErrorKind::Conflict => Self::conflict(err.message),
            DbErrorKind::Internal => Self::internal("Internal server error", err.to_string()),
        }
    }
}

impl From<AuthError> for ServiceError {
    #[track_caller]
    fn from(err: AuthError) -> Self {
        match err.kind {
            AuthErrorKind::InvalidToken => Self::forbidden("Invalid or expired token"),
            AuthErrorKind::Hashing | AuthErrorKind::Signing => {
                Self::internal("Internal server error", err.to_string())
            }
        }
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    #[track_caller]
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal("Internal server error", format!("Blocking task failed: {}", err))
    }
}

impl From<vuot_rewards::ScoreError> for ServiceError {
    #[track_caller]
    fn from(err: vuot_rewards::ScoreError) -> Self {
        debug!(value = err.value, "Score out of range");
        Self::bad_request("score must be between 0 and 100")
    }
}
