//! Database error types.

use derive_more::{Display, Error};
use tracing::instrument;

/// What went wrong at the persistence layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// A row the operation depends on does not exist.
    NotFound,
    /// A uniqueness or check constraint rejected the write.
    Conflict,
    /// Anything else: connection, migration, query or decoding failures.
    Internal,
}

/// Database error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Database error: {} at {}:{}", message, file, line)]
pub struct DbError {
    /// Error category.
    pub kind: DbErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl DbError {
    /// Creates a new internal database error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(DbErrorKind::Internal, message)
    }

    /// Creates a not-found error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_kind(DbErrorKind::NotFound, message)
    }

    /// Creates a constraint-conflict error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_kind(DbErrorKind::Conflict, message)
    }

    #[track_caller]
    fn with_kind(kind: DbErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match &err {
            Error::NotFound => Self::with_kind(DbErrorKind::NotFound, "Row not found"),
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => Self::with_kind(
                DbErrorKind::Conflict,
                format!("Unique constraint violated: {}", info.message()),
            ),
            Error::DatabaseError(DatabaseErrorKind::CheckViolation, info) => Self::with_kind(
                DbErrorKind::Conflict,
                format!("Check constraint violated: {}", info.message()),
            ),
            _ => Self::with_kind(DbErrorKind::Internal, format!("Diesel error: {}", err)),
        }
    }
}

impl From<diesel::ConnectionError> for DbError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(format!("Connection error: {}", err))
    }
}

impl From<std::num::TryFromIntError> for DbError {
    #[track_caller]
    fn from(err: std::num::TryFromIntError) -> Self {
        Self::new(format!("Stored counter out of range: {}", err))
    }
}
