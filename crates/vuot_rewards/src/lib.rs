//! Star and streak rules for quiz submissions.
//!
//! Everything in this crate is pure: the caller supplies the learner's stored
//! [`ProgressState`], today's calendar date and the submitted [`Score`], and gets
//! back the new state plus a [`RewardSummary`] describing what changed. No clock,
//! no database.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use vuot_rewards::{ProgressState, Score, settle};
//!
//! let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
//! let state = ProgressState::new(0, 4, 6, 2, NaiveDate::from_ymd_opt(2026, 3, 7));
//!
//! let (next, summary) = settle(&state, today, Score::new(90).unwrap());
//! assert_eq!(*summary.stars_earned(), 5);
//! assert_eq!(*next.current_streak(), 5);
//! assert_eq!(*next.freeze_streaks(), 0);
//! assert!(summary.streak_frozen());
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod progress;
mod score;
mod settle;
mod streak;

pub use progress::ProgressState;
pub use score::{MAX_SCORE, Score, ScoreError};
pub use settle::{RewardSummary, STAR_BONUS, STAR_THRESHOLD, settle, stars_for};
pub use streak::{StreakChange, evaluate_streak};
