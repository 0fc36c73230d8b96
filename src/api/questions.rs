//! Public `/api/questions` handlers.

use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::api::extract::{IdPath, QueryParams, blocking};
use crate::api::{ApiError, ApiResponse};
use crate::services::DEFAULT_TAG_LIMIT;
use crate::state::AppState;

/// Tag filter query.
#[derive(Debug, Default, Deserialize)]
pub struct TagQuery {
    tag: Option<String>,
    tag_key: Option<String>,
    limit: Option<i64>,
}

/// `GET /api/questions`
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<TagQuery>,
) -> Result<ApiResponse<Value>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_TAG_LIMIT);
    let questions = blocking(&state, move |s| {
        s.questions()
            .by_tag(query.tag.as_deref(), query.tag_key.as_deref(), limit)
    })
    .await
    .map_err(|e| e.context("Error fetching questions"))?;

    Ok(ApiResponse::ok(json!({
        "count": questions.len(),
        "limit": limit,
        "questions": questions,
    })))
}

/// `GET /api/questions/{id}`
#[instrument(skip(state))]
pub async fn get(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<ApiResponse<Value>, ApiError> {
    let question = blocking(&state, move |s| s.questions().get(id))
        .await
        .map_err(|e| e.context("Error fetching question"))?;
    Ok(ApiResponse::ok(json!({ "question": question })))
}
