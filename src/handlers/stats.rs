use axum::{Json, extract::State};

use crate::{
    AppState,
    error::{AppError, ErrorBody, ResultExt},
    models::LibraryStats,
};

/// get_library_stats
///
/// [Public Route] Headline counts for the dashboard tiles.
#[utoipa::path(
    get,
    path = "/api/stats/dbmcl",
    responses(
        (status = 200, description = "Stats", body = LibraryStats),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn get_library_stats(State(state): State<AppState>) -> Result<Json<LibraryStats>, AppError> {
    let stats = state
        .repo
        .get_stats()
        .await
        .or_internal("Internal server error")?;
    Ok(Json(stats))
}
