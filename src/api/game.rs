//! `/api/game` handlers.

use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::api::extract::{AuthUser, JsonBody, MaybeAuthUser, QueryParams, blocking};
use crate::api::{ApiError, ApiResponse};
use crate::db::Page;
use crate::services::{
    DEFAULT_GAME_LIMIT, DEFAULT_HISTORY_LIMIT, GameStats, HistoryPage, SubmitOutcome,
    SubmitRequest,
};
use crate::state::AppState;

/// Query for drawing a quiz.
#[derive(Debug, Default, Deserialize)]
pub struct GameQuery {
    subject: Option<String>,
    game_type: Option<String>,
    limit: Option<i64>,
}

/// Limit/offset query.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

impl PageQuery {
    /// Resolves the page, filling in `default_limit` and offset 0.
    pub(crate) fn page(&self, default_limit: i64) -> Page {
        Page::new(
            self.limit.unwrap_or(default_limit),
            self.offset.unwrap_or(0),
        )
    }
}

/// `GET /api/game/questions`
///
/// Public; a valid token only tags the request with the caller's id.
#[instrument(skip(state, caller), fields(user_id = caller.as_ref().map(|u| *u.id())))]
pub async fn questions(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    QueryParams(query): QueryParams<GameQuery>,
) -> Result<ApiResponse<Value>, ApiError> {
    let questions = blocking(&state, move |s| {
        s.questions().for_game(
            query.subject.as_deref(),
            query.game_type.as_deref(),
            query.limit.unwrap_or(DEFAULT_GAME_LIMIT),
        )
    })
    .await
    .map_err(|e| e.context("Error fetching questions"))?;

    Ok(ApiResponse::ok(json!({
        "count": questions.len(),
        "questions": questions,
    })))
}

/// `POST /api/game/submit_result`
#[instrument(skip_all, fields(user_id = user.id()))]
pub async fn submit_result(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(request): JsonBody<SubmitRequest>,
) -> Result<ApiResponse<SubmitOutcome>, ApiError> {
    let user_id = *user.id();
    let outcome = blocking(&state, move |s| s.game().submit_result(user_id, request))
        .await
        .map_err(|e| e.context("Error submitting result"))?;
    Ok(ApiResponse::ok(outcome).with_message("Result submitted successfully"))
}

/// `GET /api/game/history` and `GET /api/game/results`
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<ApiResponse<HistoryPage>, ApiError> {
    let user_id = *user.id();
    let page = query.page(DEFAULT_HISTORY_LIMIT);
    let history = blocking(&state, move |s| s.game().history(user_id, page))
        .await
        .map_err(|e| e.context("Error fetching history"))?;
    Ok(ApiResponse::ok(history))
}

/// `GET /api/game/stats`
#[instrument(skip_all, fields(user_id = user.id()))]
pub async fn stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<GameStats>, ApiError> {
    let user_id = *user.id();
    let stats = blocking(&state, move |s| s.game().stats(user_id))
        .await
        .map_err(|e| e.context("Error fetching stats"))?;
    Ok(ApiResponse::ok(stats))
}
