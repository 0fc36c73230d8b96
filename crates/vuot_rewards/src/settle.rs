//! Settling a submission into stars and streak.

use chrono::NaiveDate;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{ProgressState, Score, StreakChange, evaluate_streak};

/// Stars awarded for a score above [`STAR_THRESHOLD`].
pub const STAR_BONUS: u32 = 5;

/// Scores strictly above this earn [`STAR_BONUS`].
pub const STAR_THRESHOLD: u8 = 80;

/// What a single submission earned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct RewardSummary {
    /// Stars added to the balance.
    stars_earned: u32,
    /// Streak effect of the submission.
    change: StreakChange,
}

impl RewardSummary {
    /// Whether the streak extended the previous run.
    pub fn streak_increased(&self) -> bool {
        self.change.increased()
    }

    /// Whether freeze credits covered missed days.
    pub fn streak_frozen(&self) -> bool {
        matches!(self.change, StreakChange::Frozen { .. })
    }

    /// Freeze credits consumed.
    pub fn freeze_used(&self) -> u32 {
        self.change.freeze_used()
    }
}

/// Stars earned for a score.
#[instrument]
pub fn stars_for(score: Score) -> u32 {
    if score.value() > STAR_THRESHOLD {
        STAR_BONUS
    } else {
        0
    }
}

/// Applies a submission made on `today` with `score` to a learner's progress.
///
/// Adds the star bonus, settles the streak and stamps `today` as the last
/// learning day. The input is not modified.
#[instrument(fields(score = %score))]
pub fn settle(state: &ProgressState, today: NaiveDate, score: Score) -> (ProgressState, RewardSummary) {
    let stars_earned = stars_for(score);
    let (streaked, change) = evaluate_streak(state, today);
    let next = streaked.with_stars_added(stars_earned).with_last_learnt(today);

    info!(
        stars_earned,
        stars_balance = next.stars_balance(),
        current_streak = next.current_streak(),
        freeze_remaining = next.freeze_streaks(),
        ?change,
        "Submission settled"
    );

    (next, RewardSummary { stars_earned, change })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, d).unwrap()
    }

    fn score(v: i64) -> Score {
        Score::new(v).unwrap()
    }

    #[test]
    fn test_stars_threshold_is_exclusive() {
        for v in 0..=80 {
            assert_eq!(stars_for(score(v)), 0, "score {v}");
        }
        for v in 81..=100 {
            assert_eq!(stars_for(score(v)), STAR_BONUS, "score {v}");
        }
    }

    #[test]
    fn test_settle_adds_stars_and_stamps_today() {
        let state = ProgressState::new(12, 0, 0, 2, None);
        let (next, summary) = settle(&state, day(3), score(95));
        assert_eq!(*summary.stars_earned(), 5);
        assert_eq!(*next.stars_balance(), 17);
        assert_eq!(*next.last_learnt_date(), Some(day(3)));
        assert_eq!(*summary.change(), StreakChange::Started);
    }

    #[test]
    fn test_second_submission_same_day_keeps_streak() {
        let state = ProgressState::new(0, 0, 0, 2, None);
        let (first, _) = settle(&state, day(3), score(50));
        let (second, summary) = settle(&first, day(3), score(100));
        assert_eq!(*second.current_streak(), *first.current_streak());
        assert_eq!(*second.stars_balance(), 5);
        assert!(!summary.streak_increased());
    }

    #[test]
    fn test_frozen_example() {
        let state = ProgressState::new(0, 4, 4, 2, Some(day(7)));
        let (next, summary) = settle(&state, day(10), score(90));
        assert_eq!(*summary.stars_earned(), 5);
        assert_eq!(*next.current_streak(), 5);
        assert_eq!(*next.freeze_streaks(), 0);
        assert!(summary.streak_frozen());
        assert!(summary.streak_increased());
        assert_eq!(summary.freeze_used(), 2);
    }

    #[test]
    fn test_max_streak_never_decreases_over_sequence() {
        let days = [1, 2, 3, 3, 9, 10, 14, 15, 16, 30];
        let mut state = ProgressState::new(0, 0, 0, 2, None);
        let mut last_max = 0;
        for d in days {
            let (next, _) = settle(&state, day(d), score(70));
            assert!(*next.max_streak() >= last_max);
            assert!(*next.current_streak() <= *next.max_streak());
            last_max = *next.max_streak();
            state = next;
        }
        assert_eq!(last_max, 3);
    }

    #[test]
    fn test_balance_saturates() {
        let state = ProgressState::new(u32::MAX - 1, 0, 0, 0, None);
        let (next, _) = settle(&state, day(1), score(100));
        assert_eq!(*next.stars_balance(), u32::MAX);
    }
}
