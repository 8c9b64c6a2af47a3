use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router
///
/// Read-only catalog access and the generated preview cards. Handlers that behave
/// differently for signed-in callers (view history, search logging) take an
/// `Option<AuthUser>` instead of requiring one.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::users::register_user))
        // --- Catalog ---
        .route("/api/faculties", get(handlers::catalog::list_faculties))
        .route(
            "/api/faculties/{faculty_id}/departments",
            get(handlers::catalog::list_departments),
        )
        .route(
            "/api/departments/{department_id}/levels",
            get(handlers::catalog::list_levels),
        )
        .route(
            "/api/levels/{level_id}/courses",
            get(handlers::catalog::list_courses),
        )
        .route("/api/courses/{course_id}", get(handlers::catalog::get_course))
        // --- Course content ---
        .route(
            "/api/courses/{course_id}/resources",
            get(handlers::resources::list_course_resources),
        )
        .route(
            "/api/courses/{course_id}/cbts",
            get(handlers::cbt::list_course_cbts),
        )
        // Records a view, attributed when the caller is signed in.
        .route("/api/resources/{id}", get(handlers::resources::get_resource))
        // Anonymous calls succeed without recording anything.
        .route("/api/search/record", post(handlers::search::record_search))
        .route("/api/stats/dbmcl", get(handlers::stats::get_library_stats))
        // --- Open Graph cards ---
        .route(
            "/browse/faculties/{faculty_id}/opengraph-image",
            get(handlers::preview::faculty_image),
        )
        .route(
            "/browse/faculties/{faculty_id}/departments/{department_id}/opengraph-image",
            get(handlers::preview::department_image),
        )
        .route(
            "/browse/faculties/{faculty_id}/departments/{department_id}/levels/{level_id}/opengraph-image",
            get(handlers::preview::level_image),
        )
        .route(
            "/browse/faculties/{faculty_id}/departments/{department_id}/levels/{level_id}/courses/{course_id}/opengraph-image",
            get(handlers::preview::course_image),
        )
}
