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
    models::{AnswerRequest, AttemptDetail, AttemptReview, Cbt, CbtAttempt, SuccessResponse},
};

/// Loads the caller's own attempt. Someone else's attempt is reported exactly like
/// a missing one.
async fn owned_attempt(
    state: &AppState,
    attempt_id: Uuid,
    user_id: Uuid,
    failure: &'static str,
) -> Result<CbtAttempt, AppError> {
    state
        .repo
        .get_user_attempt(attempt_id, user_id)
        .await
        .or_internal(failure)?
        .ok_or_else(|| AppError::not_found("Attempt not found"))
}

fn ensure_open(attempt: &CbtAttempt) -> Result<(), AppError> {
    if attempt.is_completed() {
        Err(AppError::bad_request("Attempt is already completed"))
    } else {
        Ok(())
    }
}

#[utoipa::path(
    get,
    path = "/api/courses/{course_id}/cbts",
    params(("course_id" = i64, Path, description = "Course ID")),
    responses((status = 200, description = "Published CBTs of the course", body = [Cbt]))
)]
pub async fn list_course_cbts(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
) -> Result<Json<Vec<Cbt>>, AppError> {
    let cbts = state
        .repo
        .list_course_cbts(course_id)
        .await
        .or_internal("Failed to fetch CBTs")?;
    Ok(Json(cbts))
}

/// start_attempt
///
/// [Authenticated Route] Opens a new attempt on a published CBT.
#[utoipa::path(
    post,
    path = "/api/cbts/{cbt_id}/attempts",
    params(("cbt_id" = Uuid, Path, description = "CBT ID")),
    responses(
        (status = 201, description = "Attempt started", body = CbtAttempt),
        (status = 404, description = "CBT missing or unpublished", body = ErrorBody)
    )
)]
pub async fn start_attempt(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(cbt_id): Path<Uuid>,
) -> Result<(StatusCode, Json<CbtAttempt>), AppError> {
    if state
        .repo
        .get_published_cbt(cbt_id)
        .await
        .or_internal("Failed to start attempt")?
        .is_none()
    {
        return Err(AppError::not_found("CBT not found"));
    }

    let attempt = state
        .repo
        .start_attempt(cbt_id, user_id)
        .await
        .or_internal("Failed to start attempt")?;
    tracing::info!(attempt_id = %attempt.id, cbt_id = %cbt_id, "attempt started");
    Ok((StatusCode::CREATED, Json(attempt)))
}

/// save_answer
///
/// [Authenticated Route] Records the selected option for one question. Answering the
/// same question again replaces the earlier choice.
#[utoipa::path(
    post,
    path = "/api/cbts/attempts/{attempt_id}/answers",
    params(("attempt_id" = Uuid, Path, description = "Attempt ID")),
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Answer saved", body = SuccessResponse),
        (status = 400, description = "Missing ids or attempt already completed", body = ErrorBody),
        (status = 404, description = "Attempt not found", body = ErrorBody)
    )
)]
pub async fn save_answer(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
    AppJson(payload): AppJson<AnswerRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let (Some(question_id), Some(selected_option_id)) =
        (payload.question_id, payload.selected_option_id)
    else {
        return Err(AppError::bad_request(
            "Question ID and selected option ID are required",
        ));
    };

    let attempt = owned_attempt(&state, attempt_id, user_id, "Failed to save answer").await?;
    ensure_open(&attempt)?;

    state
        .repo
        .upsert_answer(attempt_id, question_id, selected_option_id)
        .await
        .or_internal("Failed to save answer")?;

    Ok(Json(SuccessResponse { success: true }))
}

/// submit_attempt
///
/// [Authenticated Route] Closes the attempt and scores it through the
/// `calculate_attempt_score` procedure, then returns the scored attempt with its
/// CBT and course.
#[utoipa::path(
    post,
    path = "/api/cbts/attempts/{attempt_id}/submit",
    params(("attempt_id" = Uuid, Path, description = "Attempt ID")),
    responses(
        (status = 200, description = "Scored attempt", body = AttemptDetail),
        (status = 400, description = "Attempt already completed", body = ErrorBody),
        (status = 404, description = "Attempt not found", body = ErrorBody)
    )
)]
pub async fn submit_attempt(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<AttemptDetail>, AppError> {
    let attempt = owned_attempt(&state, attempt_id, user_id, "Failed to submit attempt").await?;
    ensure_open(&attempt)?;

    state
        .repo
        .calculate_attempt_score(attempt_id)
        .await
        .or_internal("Failed to submit attempt")?;

    let detail = state
        .repo
        .get_attempt_detail(attempt_id)
        .await
        .or_internal("Failed to submit attempt")?
        .ok_or_else(|| AppError::not_found("Attempt not found"))?;

    tracing::info!(
        attempt_id = %attempt_id,
        score = ?detail.attempt.score,
        passed = ?detail.attempt.passed,
        "attempt submitted"
    );
    Ok(Json(detail))
}

/// get_attempt_review
///
/// [Authenticated Route] Per-question breakdown of a completed attempt, as produced
/// by the `get_attempt_review` procedure.
#[utoipa::path(
    get,
    path = "/api/cbts/attempts/{attempt_id}/review",
    params(("attempt_id" = Uuid, Path, description = "Attempt ID")),
    responses(
        (status = 200, description = "Attempt and review rows", body = AttemptReview),
        (status = 400, description = "Attempt not yet completed", body = ErrorBody),
        (status = 404, description = "Attempt not found", body = ErrorBody)
    )
)]
pub async fn get_attempt_review(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<AttemptReview>, AppError> {
    let attempt = owned_attempt(&state, attempt_id, user_id, "Failed to fetch review").await?;
    if !attempt.is_completed() {
        return Err(AppError::bad_request("Attempt is not yet completed"));
    }

    let detail = state
        .repo
        .get_attempt_detail(attempt_id)
        .await
        .or_internal("Failed to fetch review")?
        .ok_or_else(|| AppError::not_found("Attempt not found"))?;

    let review = state
        .repo
        .get_attempt_review(attempt_id)
        .await
        .or_internal("Failed to fetch review")?;

    Ok(Json(AttemptReview {
        attempt: detail,
        review,
    }))
}
