use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router
///
/// Everything a signed-in student can do. The router is wrapped in the auth
/// middleware, so unauthenticated requests are rejected with 401 before any
/// handler runs.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/api/me", get(handlers::users::get_me))
        .route("/api/me/bookmarks", get(handlers::resources::list_bookmarks))
        // --- Resources ---
        // Two-step upload: presigned PUT first, then register the key.
        .route(
            "/api/resources/upload-url",
            post(handlers::resources::get_upload_url),
        )
        .route("/api/resources", post(handlers::resources::create_resource))
        .route(
            "/api/resources/{id}/download",
            get(handlers::resources::download_resource),
        )
        .route(
            "/api/resources/{id}/bookmark",
            post(handlers::resources::toggle_bookmark),
        )
        // --- CBT attempts ---
        .route(
            "/api/cbts/{cbt_id}/attempts",
            post(handlers::cbt::start_attempt),
        )
        .route(
            "/api/cbts/attempts/{attempt_id}/answers",
            post(handlers::cbt::save_answer),
        )
        .route(
            "/api/cbts/attempts/{attempt_id}/submit",
            post(handlers::cbt::submit_attempt),
        )
        .route(
            "/api/cbts/attempts/{attempt_id}/review",
            get(handlers::cbt::get_attempt_review),
        )
}
