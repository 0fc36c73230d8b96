//! Lazy streak evaluation.
//!
//! Streaks are never advanced by a background job. Instead, every submission
//! compares today's date with the last learning day and settles the gap at that
//! moment, spending freeze credits on the missed days when there are enough of
//! them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::ProgressState;

/// How a submission affected the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreakChange {
    /// First ever submission; the streak starts at one.
    Started,
    /// Already learnt today; nothing moves.
    SameDay,
    /// Learnt yesterday; the streak grows by one.
    Extended,
    /// Missed days were covered by freeze credits and the streak grew by one.
    Frozen {
        /// Credits spent, one per missed day.
        freeze_used: u32,
    },
    /// Missed more days than the credits cover; the streak restarts at one.
    Reset,
}

impl StreakChange {
    /// Whether the submission extended the previous run.
    pub fn increased(self) -> bool {
        matches!(self, Self::Extended | Self::Frozen { .. })
    }

    /// Credits consumed by this change.
    pub fn freeze_used(self) -> u32 {
        match self {
            Self::Frozen { freeze_used } => freeze_used,
            _ => 0,
        }
    }
}

/// Settles the streak for a submission made on `today`.
///
/// The returned state keeps `max_streak >= current_streak`. The last learning
/// date is left untouched; [`crate::settle`] stamps it.
#[instrument(fields(last = ?state.last_learnt_date(), streak = state.current_streak()))]
pub fn evaluate_streak(state: &ProgressState, today: NaiveDate) -> (ProgressState, StreakChange) {
    let current = *state.current_streak();
    let freezes = *state.freeze_streaks();

    let Some(last) = *state.last_learnt_date() else {
        debug!("First submission, starting streak");
        return (state.with_streak(1, freezes), StreakChange::Started);
    };

    let gap = (today - last).num_days();
    debug!(gap, "Days since last submission");

    // A last date in the future only happens on clock skew.
    if gap <= 0 {
        return (*state, StreakChange::SameDay);
    }

    if gap == 1 {
        let extended = current.saturating_add(1);
        return (state.with_streak(extended, freezes), StreakChange::Extended);
    }

    let missed = u32::try_from(gap - 1).unwrap_or(u32::MAX);
    if freezes >= missed {
        let extended = current.saturating_add(1);
        debug!(missed, remaining = freezes - missed, "Freeze credits cover the gap");
        (
            state.with_streak(extended, freezes - missed),
            StreakChange::Frozen {
                freeze_used: missed,
            },
        )
    } else {
        debug!(missed, freezes, "Not enough freeze credits, resetting streak");
        (state.with_streak(1, freezes), StreakChange::Reset)
    }
}
