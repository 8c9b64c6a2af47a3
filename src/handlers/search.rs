use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppJson, ErrorBody, ResultExt},
    models::{SearchRecordRequest, SearchRecordResponse},
};

/// record_search
///
/// [Public Route] Stores a search term in the caller's history. Anonymous callers get
/// a successful no-op whatever the body holds; for signed-in callers an unreadable
/// body is an invalid query.
#[utoipa::path(
    post,
    path = "/api/search/record",
    request_body = SearchRecordRequest,
    responses(
        (status = 200, description = "Recorded, or skipped for anonymous callers", body = SearchRecordResponse),
        (status = 400, description = "Invalid query", body = ErrorBody)
    )
)]
pub async fn record_search(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    payload: Result<AppJson<SearchRecordRequest>, AppError>,
) -> Result<Json<SearchRecordResponse>, AppError> {
    let Some(user) = user else {
        return Ok(Json(SearchRecordResponse {
            success: true,
            recorded: false,
        }));
    };

    let query = payload
        .ok()
        .and_then(|AppJson(payload)| payload.trimmed_query())
        .ok_or_else(|| AppError::bad_request("Invalid query"))?;

    state
        .repo
        .record_search(user.id, &query)
        .await
        .or_internal("Failed to record search")?;

    Ok(Json(SearchRecordResponse {
        success: true,
        recorded: true,
    }))
}
