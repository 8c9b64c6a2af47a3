use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppJson, ErrorBody, ResultExt},
    models::{QuestionPayload, QuestionWithOptions, SuccessResponse},
};

/// list_questions
///
/// [Admin Route] Every question of a CBT with its options, in display order.
#[utoipa::path(
    get,
    path = "/api/admin/cbts/{cbt_id}/questions",
    params(("cbt_id" = Uuid, Path, description = "CBT ID")),
    responses(
        (status = 200, description = "Questions", body = [QuestionWithOptions]),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn list_questions(
    user: AuthUser,
    State(state): State<AppState>,
    Path(cbt_id): Path<Uuid>,
) -> Result<Json<Vec<QuestionWithOptions>>, AppError> {
    user.require_admin()?;
    let questions = state
        .repo
        .list_questions(cbt_id)
        .await
        .or_internal("Failed to fetch questions")?;
    Ok(Json(questions))
}

/// create_question
///
/// [Admin Route] Appends a question to the CBT. The question and its options are
/// written in one transaction.
#[utoipa::path(
    post,
    path = "/api/admin/cbts/{cbt_id}/questions",
    params(("cbt_id" = Uuid, Path, description = "CBT ID")),
    request_body = QuestionPayload,
    responses(
        (status = 201, description = "Created", body = QuestionWithOptions),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn create_question(
    user: AuthUser,
    State(state): State<AppState>,
    Path(cbt_id): Path<Uuid>,
    AppJson(payload): AppJson<QuestionPayload>,
) -> Result<(StatusCode, Json<QuestionWithOptions>), AppError> {
    user.require_admin()?;
    let question = payload.into_new_question()?;

    let created = state
        .repo
        .create_question(cbt_id, &question)
        .await
        .or_internal("Failed to create question")?;
    tracing::info!(cbt_id = %cbt_id, question_id = %created.question.id, "question created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/admin/cbts/{cbt_id}/questions/{question_id}",
    params(
        ("cbt_id" = Uuid, Path, description = "CBT ID"),
        ("question_id" = Uuid, Path, description = "Question ID")
    ),
    responses(
        (status = 200, description = "Found", body = QuestionWithOptions),
        (status = 404, description = "Question not found", body = ErrorBody)
    )
)]
pub async fn get_question(
    user: AuthUser,
    State(state): State<AppState>,
    Path((cbt_id, question_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<QuestionWithOptions>, AppError> {
    user.require_admin()?;
    state
        .repo
        .get_question(cbt_id, question_id)
        .await
        .or_internal("Failed to fetch question")?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Question not found"))
}

/// update_question
///
/// [Admin Route] Partial update. Fields left out keep their value; a non-empty
/// `options` list replaces the question's options wholesale.
#[utoipa::path(
    patch,
    path = "/api/admin/cbts/{cbt_id}/questions/{question_id}",
    params(
        ("cbt_id" = Uuid, Path, description = "CBT ID"),
        ("question_id" = Uuid, Path, description = "Question ID")
    ),
    request_body = QuestionPayload,
    responses(
        (status = 200, description = "Updated", body = QuestionWithOptions),
        (status = 404, description = "Question not found", body = ErrorBody)
    )
)]
pub async fn update_question(
    user: AuthUser,
    State(state): State<AppState>,
    Path((cbt_id, question_id)): Path<(Uuid, Uuid)>,
    AppJson(payload): AppJson<QuestionPayload>,
) -> Result<Json<QuestionWithOptions>, AppError> {
    user.require_admin()?;
    state
        .repo
        .update_question(cbt_id, question_id, &payload)
        .await
        .or_internal("Failed to update question")?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Question not found"))
}

#[utoipa::path(
    delete,
    path = "/api/admin/cbts/{cbt_id}/questions/{question_id}",
    params(
        ("cbt_id" = Uuid, Path, description = "CBT ID"),
        ("question_id" = Uuid, Path, description = "Question ID")
    ),
    responses(
        (status = 200, description = "Deleted", body = SuccessResponse),
        (status = 404, description = "Question not found", body = ErrorBody)
    )
)]
pub async fn delete_question(
    user: AuthUser,
    State(state): State<AppState>,
    Path((cbt_id, question_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SuccessResponse>, AppError> {
    user.require_admin()?;
    let deleted = state
        .repo
        .delete_question(cbt_id, question_id)
        .await
        .or_internal("Failed to delete question")?;

    if !deleted {
        return Err(AppError::not_found("Question not found"));
    }
    tracing::info!(cbt_id = %cbt_id, question_id = %question_id, "question deleted");
    Ok(Json(SuccessResponse { success: true }))
}
