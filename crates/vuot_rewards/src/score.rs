//! Validated quiz score.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Highest score a submission may carry.
pub const MAX_SCORE: u8 = 100;

/// A quiz score in the range `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    /// Validates a raw score.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreError`] when the value lies outside `0..=100`.
    #[track_caller]
    #[instrument]
    pub fn new(raw: i64) -> Result<Self, ScoreError> {
        match u8::try_from(raw) {
            Ok(value) if value <= MAX_SCORE => Ok(Self(value)),
            _ => Err(ScoreError::new(raw)),
        }
    }

    /// Returns the score as a plain integer.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Score {
    type Error = ScoreError;

    #[track_caller]
    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

/// Score outside the accepted range.
#[derive(Debug, Clone, Display, Error)]
#[display("score must be between 0 and {}, got {} (at {}:{})", MAX_SCORE, value, file, line)]
pub struct ScoreError {
    /// The rejected value.
    pub value: i64,
    /// Line number where the error was raised.
    pub line: u32,
    /// Source file where the error was raised.
    pub file: &'static str,
}

impl ScoreError {
    /// Creates a new score error with caller location tracking.
    #[track_caller]
    pub fn new(value: i64) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            value,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_bounds() {
        assert_eq!(Score::new(0).unwrap().value(), 0);
        assert_eq!(Score::new(100).unwrap().value(), 100);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Score::new(-1).is_err());
        assert!(Score::new(101).is_err());
        assert!(Score::new(i64::MAX).is_err());
    }

    #[test]
    fn test_error_reports_value() {
        let err = Score::new(250).unwrap_err();
        assert_eq!(err.value, 250);
        assert!(err.to_string().contains("between 0 and 100"));
    }
}
