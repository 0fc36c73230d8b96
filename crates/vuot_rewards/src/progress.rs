//! Learner progress counters.

use chrono::NaiveDate;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// The reward-relevant counters stored on a learner's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Getters, Serialize, Deserialize)]
pub struct ProgressState {
    /// Stars available to spend in the shop.
    stars_balance: u32,
    /// Length of the current run of consecutive learning days.
    current_streak: u32,
    /// Longest run ever reached.
    max_streak: u32,
    /// Freeze credits that cover missed days.
    freeze_streaks: u32,
    /// Calendar day of the last recorded submission.
    last_learnt_date: Option<NaiveDate>,
}

impl ProgressState {
    /// Creates a progress state from stored counters.
    #[instrument]
    pub fn new(
        stars_balance: u32,
        current_streak: u32,
        max_streak: u32,
        freeze_streaks: u32,
        last_learnt_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            stars_balance,
            current_streak,
            max_streak,
            freeze_streaks,
            last_learnt_date,
        }
    }

    /// Returns a copy with `stars` added to the balance.
    pub(crate) fn with_stars_added(mut self, stars: u32) -> Self {
        self.stars_balance = self.stars_balance.saturating_add(stars);
        self
    }

    pub(crate) fn with_streak(mut self, current_streak: u32, freeze_streaks: u32) -> Self {
        self.current_streak = current_streak;
        self.freeze_streaks = freeze_streaks;
        self.max_streak = self.max_streak.max(current_streak);
        self
    }

    pub(crate) fn with_last_learnt(mut self, day: NaiveDate) -> Self {
        self.last_learnt_date = Some(day);
        self
    }
}
