//! Quiz submissions, history and statistics.

use std::sync::Arc;

use chrono::NaiveDate;
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};
use vuot_rewards::{Score, settle};

use crate::clock::Clock;
use crate::db::{ExamResult, ExamStats, ExamTypeStats, NewExamResult, Page, QuizRepository};
use crate::services::ServiceError;

/// Attempts returned per history page by default.
pub const DEFAULT_HISTORY_LIMIT: i64 = 20;

/// Submission input as sent by the client.
#[derive(Debug, Clone, Default, Deserialize, new)]
pub struct SubmitRequest {
    exam_type: Option<String>,
    score: Option<i64>,
    /// Free-form attempt detail; a JSON string is stored verbatim.
    details_json: Option<Value>,
}

/// Streak part of a submission outcome.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize)]
pub struct StreakStatus {
    current_streak: u32,
    max_streak: u32,
    streak_increased: bool,
    streak_frozen: bool,
    freeze_used: u32,
    freeze_remaining: u32,
}

/// Counters of the user after a submission.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize)]
pub struct ProgressSnapshot {
    id: i32,
    stars_balance: u32,
    current_streak: u32,
    max_streak: u32,
    freeze_streaks: u32,
    last_learnt_date: Option<NaiveDate>,
}

/// Everything a submission earned.
#[derive(Debug, Clone, Getters, Serialize)]
pub struct SubmitOutcome {
    exam_result_id: i32,
    score: u8,
    exam_type: String,
    stars_earned: u32,
    stars_balance: u32,
    streak_status: StreakStatus,
    user: ProgressSnapshot,
}

/// One attempt with its details decoded.
#[derive(Debug, Clone, Getters, Serialize)]
pub struct HistoryEntry {
    id: i32,
    exam_type: String,
    score: i32,
    details_json: Option<Value>,
    created_at: chrono::NaiveDateTime,
}

impl From<ExamResult> for HistoryEntry {
    fn from(result: ExamResult) -> Self {
        let details_json = result.details_json().as_deref().map(|raw| {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        });
        Self {
            id: *result.id(),
            exam_type: result.exam_type().clone(),
            score: *result.score(),
            details_json,
            created_at: *result.created_at(),
        }
    }
}

/// One page of attempts.
#[derive(Debug, Clone, Getters, Serialize)]
pub struct HistoryPage {
    history: Vec<HistoryEntry>,
    count: usize,
    limit: i64,
    offset: i64,
}

/// Progress counters shown on the statistics view.
#[derive(Debug, Clone, Getters, Serialize)]
pub struct ProgressView {
    stars_balance: i32,
    current_streak: i32,
    max_streak: i32,
    freeze_streaks: i32,
    last_learnt_date: Option<NaiveDate>,
    created_at: chrono::NaiveDateTime,
}

/// Progress plus attempt aggregates.
#[derive(Debug, Clone, Getters, Serialize)]
pub struct GameStats {
    user: ProgressView,
    exam_stats: ExamStats,
    stats_by_type: Vec<ExamTypeStats>,
}

/// Service layer for quiz attempts.
#[derive(Debug, Clone)]
pub struct GameService {
    repository: QuizRepository,
    clock: Arc<dyn Clock>,
}

impl GameService {
    /// Creates a new game service reading "today" from `clock`.
    #[instrument(skip(repository, clock))]
    pub fn new(repository: QuizRepository, clock: Arc<dyn Clock>) -> Self {
        info!("Creating GameService");
        Self { repository, clock }
    }

    /// Records an attempt, awards stars and settles the streak atomically.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] for a missing exam type or score, a score
    /// outside `0..=100`, or an unknown user.
    #[instrument(skip(self, request), fields(exam_type = ?request.exam_type, score = ?request.score))]
    pub fn submit_result(
        &self,
        user_id: i32,
        request: SubmitRequest,
    ) -> Result<SubmitOutcome, ServiceError> {
        let (exam_type, raw_score) = match (request.exam_type, request.score) {
            (Some(t), Some(s)) if !t.trim().is_empty() => (t, s),
            _ => return Err(ServiceError::bad_request("exam_type and score are required")),
        };
        let score = Score::new(raw_score)?;

        let details = request.details_json.and_then(|value| match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });

        let today = self.clock.today();
        debug!(%today, "Settling submission");

        let submission = self.repository.record_submission(
            NewExamResult::new(user_id, exam_type.clone(), i32::from(score.value()), details),
            |state| settle(state, today, score),
        )?;

        let user = submission.user();
        let summary = submission.summary();
        let progress = user.progress()?;

        info!(
            user_id,
            stars_earned = summary.stars_earned(),
            current_streak = progress.current_streak(),
            "✅ Result submitted"
        );

        Ok(SubmitOutcome {
            exam_result_id: *submission.exam_result().id(),
            score: score.value(),
            exam_type,
            stars_earned: *summary.stars_earned(),
            stars_balance: *progress.stars_balance(),
            streak_status: StreakStatus {
                current_streak: *progress.current_streak(),
                max_streak: *progress.max_streak(),
                streak_increased: summary.streak_increased(),
                streak_frozen: summary.streak_frozen(),
                freeze_used: summary.freeze_used(),
                freeze_remaining: *progress.freeze_streaks(),
            },
            user: ProgressSnapshot {
                id: *user.id(),
                stars_balance: *progress.stars_balance(),
                current_streak: *progress.current_streak(),
                max_streak: *progress.max_streak(),
                freeze_streaks: *progress.freeze_streaks(),
                last_learnt_date: *progress.last_learnt_date(),
            },
        })
    }

    /// Returns a page of the user's attempts, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the page is invalid or the query fails.
    #[instrument(skip(self))]
    pub fn history(&self, user_id: i32, page: Page) -> Result<HistoryPage, ServiceError> {
        check_page(&page)?;
        let history: Vec<HistoryEntry> = self
            .repository
            .list_results(user_id, page)?
            .into_iter()
            .map(HistoryEntry::from)
            .collect();

        Ok(HistoryPage {
            count: history.len(),
            history,
            limit: *page.limit(),
            offset: *page.offset(),
        })
    }

    /// Returns progress counters and attempt aggregates.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the user does not exist.
    #[instrument(skip(self))]
    pub fn stats(&self, user_id: i32) -> Result<GameStats, ServiceError> {
        let user = self
            .repository
            .get_user(user_id)?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        let results = self.repository.all_results(user_id)?;

        Ok(GameStats {
            user: ProgressView {
                stars_balance: *user.stars_balance(),
                current_streak: *user.current_streak(),
                max_streak: *user.max_streak(),
                freeze_streaks: *user.freeze_streaks(),
                last_learnt_date: *user.last_learnt_date(),
                created_at: *user.created_at(),
            },
            exam_stats: ExamStats::from_results(&results),
            stats_by_type: ExamTypeStats::group(&results),
        })
    }
}

/// Rejects negative or zero limits and negative offsets.
#[track_caller]
pub(crate) fn check_page(page: &Page) -> Result<(), ServiceError> {
    if *page.limit() <= 0 || *page.offset() < 0 {
        return Err(ServiceError::bad_request(
            "limit must be positive and offset must not be negative",
        ));
    }
    Ok(())
}
