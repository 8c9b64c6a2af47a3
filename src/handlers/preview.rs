use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::fmt::Display;

use crate::{AppState, error::ResultExt, preview::PreviewCard, repository::RepoResult};

/// Lookup failures only degrade the card to its fallback text.
fn or_fallback<T>(result: RepoResult<Option<T>>, what: impl Display) -> Option<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!("preview lookup failed for {}: {}", what, e);
        None
    })
}

async fn png_response(state: &AppState, card: PreviewCard) -> Response {
    let assets = state.preview.clone();
    let rendered = tokio::task::spawn_blocking(move || card.render_png(&assets))
        .await
        .or_internal("Failed to render preview")
        .and_then(|result| result.or_internal("Failed to render preview"));

    match rendered {
        Ok(png) => (
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, "public, max-age=3600"),
            ],
            png,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/browse/faculties/{faculty_id}/opengraph-image",
    params(("faculty_id" = i64, Path, description = "Faculty ID")),
    responses((status = 200, description = "1200x630 PNG card", content_type = "image/png", body = Vec<u8>))
)]
pub async fn faculty_image(
    State(state): State<AppState>,
    Path(faculty_id): Path<i64>,
) -> Response {
    let faculty = or_fallback(
        state.repo.get_faculty(faculty_id).await,
        format_args!("faculty {}", faculty_id),
    );
    png_response(&state, PreviewCard::faculty(faculty.as_ref())).await
}

#[utoipa::path(
    get,
    path = "/browse/faculties/{faculty_id}/departments/{department_id}/opengraph-image",
    params(
        ("faculty_id" = i64, Path, description = "Faculty ID"),
        ("department_id" = i64, Path, description = "Department ID")
    ),
    responses((status = 200, description = "1200x630 PNG card", content_type = "image/png", body = Vec<u8>))
)]
pub async fn department_image(
    State(state): State<AppState>,
    Path((faculty_id, department_id)): Path<(i64, i64)>,
) -> Response {
    let (faculty, department) = tokio::join!(
        state.repo.get_faculty(faculty_id),
        state.repo.get_faculty_department(faculty_id, department_id),
    );
    let faculty = or_fallback(faculty, format_args!("faculty {}", faculty_id));
    let department = or_fallback(department, format_args!("department {}", department_id));

    png_response(
        &state,
        PreviewCard::department(faculty.as_ref(), department.as_ref()),
    )
    .await
}

#[utoipa::path(
    get,
    path = "/browse/faculties/{faculty_id}/departments/{department_id}/levels/{level_id}/opengraph-image",
    params(
        ("faculty_id" = i64, Path, description = "Faculty ID"),
        ("department_id" = i64, Path, description = "Department ID"),
        ("level_id" = i64, Path, description = "Academic level ID")
    ),
    responses((status = 200, description = "1200x630 PNG card", content_type = "image/png", body = Vec<u8>))
)]
pub async fn level_image(
    State(state): State<AppState>,
    Path((faculty_id, department_id, level_id)): Path<(i64, i64, i64)>,
) -> Response {
    let (faculty, department, level) = tokio::join!(
        state.repo.get_faculty(faculty_id),
        state.repo.get_faculty_department(faculty_id, department_id),
        state.repo.get_department_level(department_id, level_id),
    );
    let faculty = or_fallback(faculty, format_args!("faculty {}", faculty_id));
    let department = or_fallback(department, format_args!("department {}", department_id));
    let level = or_fallback(level, format_args!("level {}", level_id));

    // Courses are only counted for a level that belongs to the department.
    let course_count = match &level {
        Some(level) => state
            .repo
            .count_level_courses(level.id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("preview course count failed for level {}: {}", level.id, e);
                0
            }),
        None => 0,
    };

    png_response(
        &state,
        PreviewCard::level(
            faculty.as_ref(),
            department.as_ref(),
            level.as_ref(),
            course_count,
        ),
    )
    .await
}

#[utoipa::path(
    get,
    path = "/browse/faculties/{faculty_id}/departments/{department_id}/levels/{level_id}/courses/{course_id}/opengraph-image",
    params(
        ("faculty_id" = i64, Path, description = "Faculty ID"),
        ("department_id" = i64, Path, description = "Department ID"),
        ("level_id" = i64, Path, description = "Academic level ID"),
        ("course_id" = i64, Path, description = "Course ID")
    ),
    responses((status = 200, description = "1200x630 PNG card", content_type = "image/png", body = Vec<u8>))
)]
pub async fn course_image(
    State(state): State<AppState>,
    Path((faculty_id, department_id, level_id, course_id)): Path<(i64, i64, i64, i64)>,
) -> Response {
    let (department, level, course) = tokio::join!(
        state.repo.get_faculty_department(faculty_id, department_id),
        state.repo.get_department_level(department_id, level_id),
        state.repo.get_course(course_id),
    );
    let department = or_fallback(department, format_args!("department {}", department_id));
    let level = or_fallback(level, format_args!("level {}", level_id));
    let course = or_fallback(course, format_args!("course {}", course_id));

    png_response(
        &state,
        PreviewCard::course(department.as_ref(), level.as_ref(), course.as_ref()),
    )
    .await
}
