//! Authentication error types.

use derive_more::{Display, Error};
use tracing::instrument;

/// What failed while handling credentials or tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Password hashing or hash parsing failed.
    Hashing,
    /// A token could not be signed.
    Signing,
    /// A token was malformed, forged or expired.
    InvalidToken,
}

/// Authentication error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Auth error: {} at {}:{}", message, file, line)]
pub struct AuthError {
    /// Error category.
    pub kind: AuthErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl AuthError {
    /// Creates a new auth error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
