use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod preview;
pub mod repository;
pub mod storage;

pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppJson};
pub use preview::PreviewAssets;
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::users::register_user, handlers::users::get_me,
        handlers::catalog::list_faculties, handlers::catalog::list_departments,
        handlers::catalog::list_levels, handlers::catalog::list_courses,
        handlers::catalog::get_course, handlers::catalog::create_department,
        handlers::catalog::get_department, handlers::catalog::update_department,
        handlers::catalog::delete_department, handlers::catalog::create_course,
        handlers::catalog::get_admin_course, handlers::catalog::update_course,
        handlers::catalog::delete_course,
        handlers::resources::list_course_resources, handlers::resources::get_resource,
        handlers::resources::get_upload_url, handlers::resources::create_resource,
        handlers::resources::download_resource, handlers::resources::toggle_bookmark,
        handlers::resources::list_bookmarks, handlers::resources::list_pending_resources,
        handlers::resources::approve_resource, handlers::resources::reject_resource,
        handlers::search::record_search,
        handlers::stats::get_library_stats,
        handlers::cbt::list_course_cbts, handlers::cbt::start_attempt,
        handlers::cbt::save_answer, handlers::cbt::submit_attempt,
        handlers::cbt::get_attempt_review,
        handlers::questions::list_questions, handlers::questions::create_question,
        handlers::questions::get_question, handlers::questions::update_question,
        handlers::questions::delete_question,
        handlers::preview::faculty_image, handlers::preview::department_image,
        handlers::preview::level_image, handlers::preview::course_image
    ),
    components(
        schemas(
            error::ErrorBody,
            models::User, models::RegisterUserRequest,
            models::Faculty, models::Department, models::AcademicLevel, models::Course,
            models::DepartmentForm, models::CourseForm,
            models::Resource, models::PendingResource, models::ResourceShelf,
            models::CreateResourceRequest, models::UploadUrlRequest, models::UploadUrlResponse,
            models::DownloadResponse, models::RejectResourceRequest, models::BookmarkResponse,
            models::SearchRecordRequest, models::SearchRecordResponse, models::SuccessResponse,
            models::LibraryStats,
            models::Cbt, models::Question, models::QuestionOption, models::QuestionWithOptions,
            models::OptionPayload, models::QuestionPayload, models::CbtAttempt,
            models::AttemptCourse, models::AttemptCbt, models::AttemptDetail,
            models::AttemptReview, models::AnswerRequest,
        )
    ),
    tags(
        (name = "campus-library", description = "Campus Library API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable container for every service a handler may need.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub storage: StorageState,
    pub config: AppConfig,
    /// Branding for the Open Graph cards, loaded once at startup.
    pub preview: Arc<PreviewAssets>,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Runs the `AuthUser` extractor ahead of the handler. A failed extraction rejects
/// the request (401, or 500 if the role lookup fails) before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the public, authenticated and admin routers and wraps them in the
/// request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/api/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Span for `TraceLayer`: method, URI and the request id set by `SetRequestIdLayer`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
