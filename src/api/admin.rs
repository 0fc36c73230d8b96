//! `/api/admin` handlers. Every route requires an admin token.

use axum::extract::State;
use serde_json::{Value, json};
use tracing::instrument;

use crate::api::extract::{AdminUser, IdPath, JsonBody, QueryParams, blocking};
use crate::api::game::PageQuery;
use crate::api::{ApiError, ApiResponse};
use crate::services::{DEFAULT_LIST_LIMIT, QuestionInput};
use crate::state::AppState;

/// `POST /api/admin/questions`
#[instrument(skip_all, fields(admin_id = admin.id()))]
pub async fn create_question(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    JsonBody(input): JsonBody<QuestionInput>,
) -> Result<ApiResponse<Value>, ApiError> {
    let question = blocking(&state, move |s| s.questions().create(input))
        .await
        .map_err(|e| e.context("Error creating question"))?;
    Ok(ApiResponse::created(json!({ "question": question }))
        .with_message("Question created successfully"))
}

/// `GET /api/admin/questions`
#[instrument(skip(state, admin), fields(admin_id = admin.id()))]
pub async fn list_questions(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<ApiResponse<Value>, ApiError> {
    let page = query.page(DEFAULT_LIST_LIMIT);
    let questions = blocking(&state, move |s| s.questions().list_all(page))
        .await
        .map_err(|e| e.context("Error fetching questions"))?;

    Ok(ApiResponse::ok(json!({
        "count": questions.len(),
        "limit": page.limit(),
        "offset": page.offset(),
        "questions": questions,
    })))
}

/// `PUT /api/admin/questions/{id}`
#[instrument(skip(state, admin, input), fields(admin_id = admin.id()))]
pub async fn update_question(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    IdPath(id): IdPath,
    JsonBody(input): JsonBody<QuestionInput>,
) -> Result<ApiResponse<Value>, ApiError> {
    let question = blocking(&state, move |s| s.questions().update(id, input))
        .await
        .map_err(|e| e.context("Error updating question"))?;
    Ok(ApiResponse::ok(json!({ "question": question }))
        .with_message("Question updated successfully"))
}

/// `DELETE /api/admin/questions/{id}`
#[instrument(skip(state, admin), fields(admin_id = admin.id()))]
pub async fn delete_question(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    IdPath(id): IdPath,
) -> Result<ApiResponse<Value>, ApiError> {
    blocking(&state, move |s| s.questions().delete(id))
        .await
        .map_err(|e| e.context("Error deleting question"))?;
    Ok(ApiResponse::ok(json!({ "id": id })).with_message("Question deleted successfully"))
}
