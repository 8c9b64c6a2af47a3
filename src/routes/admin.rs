use crate::{AppState, handlers::{catalog, questions, resources}};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router
///
/// Catalog management, resource moderation and CBT question authoring. Mounted
/// under `/api/admin` behind the auth middleware; each handler additionally
/// rejects non-admin callers with 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Catalog ---
        .route(
            "/faculties/{faculty_id}/departments",
            post(catalog::create_department),
        )
        .route(
            "/departments/{department_id}",
            get(catalog::get_department)
                .put(catalog::update_department)
                .delete(catalog::delete_department),
        )
        .route("/levels/{level_id}/courses", post(catalog::create_course))
        .route(
            "/courses/{course_id}",
            get(catalog::get_admin_course)
                .put(catalog::update_course)
                .delete(catalog::delete_course),
        )
        // --- Moderation queue ---
        .route("/resources/pending", get(resources::list_pending_resources))
        .route("/resources/{id}/approve", post(resources::approve_resource))
        .route("/resources/{id}/reject", post(resources::reject_resource))
        // --- CBT questions ---
        .route(
            "/cbts/{cbt_id}/questions",
            get(questions::list_questions).post(questions::create_question),
        )
        .route(
            "/cbts/{cbt_id}/questions/{question_id}",
            get(questions::get_question)
                .patch(questions::update_question)
                .delete(questions::delete_question),
        )
}
