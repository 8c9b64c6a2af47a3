use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppJson, ErrorBody, ResultExt},
    models::{AcademicLevel, Course, CourseForm, Department, DepartmentForm, Faculty},
};

// --- Browse (public) ---

#[utoipa::path(
    get,
    path = "/api/faculties",
    responses((status = 200, description = "All faculties", body = [Faculty]))
)]
pub async fn list_faculties(State(state): State<AppState>) -> Result<Json<Vec<Faculty>>, AppError> {
    let faculties = state
        .repo
        .list_faculties()
        .await
        .or_internal("Failed to fetch faculties")?;
    Ok(Json(faculties))
}

#[utoipa::path(
    get,
    path = "/api/faculties/{faculty_id}/departments",
    params(("faculty_id" = i64, Path, description = "Faculty ID")),
    responses((status = 200, description = "Departments of the faculty", body = [Department]))
)]
pub async fn list_departments(
    State(state): State<AppState>,
    Path(faculty_id): Path<i64>,
) -> Result<Json<Vec<Department>>, AppError> {
    let departments = state
        .repo
        .list_departments(faculty_id)
        .await
        .or_internal("Failed to fetch departments")?;
    Ok(Json(departments))
}

#[utoipa::path(
    get,
    path = "/api/departments/{department_id}/levels",
    params(("department_id" = i64, Path, description = "Department ID")),
    responses((status = 200, description = "Academic levels, lowest first", body = [AcademicLevel]))
)]
pub async fn list_levels(
    State(state): State<AppState>,
    Path(department_id): Path<i64>,
) -> Result<Json<Vec<AcademicLevel>>, AppError> {
    let levels = state
        .repo
        .list_levels(department_id)
        .await
        .or_internal("Failed to fetch levels")?;
    Ok(Json(levels))
}

#[utoipa::path(
    get,
    path = "/api/levels/{level_id}/courses",
    params(("level_id" = i64, Path, description = "Academic level ID")),
    responses((status = 200, description = "Courses of the level", body = [Course]))
)]
pub async fn list_courses(
    State(state): State<AppState>,
    Path(level_id): Path<i64>,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = state
        .repo
        .list_courses(level_id)
        .await
        .or_internal("Failed to fetch courses")?;
    Ok(Json(courses))
}

#[utoipa::path(
    get,
    path = "/api/courses/{course_id}",
    params(("course_id" = i64, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Found", body = Course),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
) -> Result<Json<Course>, AppError> {
    state
        .repo
        .get_course(course_id)
        .await
        .or_internal("Failed to fetch course")?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Course not found"))
}

// --- Departments (admin) ---

/// create_department
///
/// [Admin Route] Adds a department to a faculty. Every form field is required.
#[utoipa::path(
    post,
    path = "/api/admin/faculties/{faculty_id}/departments",
    params(("faculty_id" = i64, Path, description = "Faculty ID")),
    request_body = DepartmentForm,
    responses(
        (status = 201, description = "Created", body = Department),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn create_department(
    user: AuthUser,
    State(state): State<AppState>,
    Path(faculty_id): Path<i64>,
    AppJson(form): AppJson<DepartmentForm>,
) -> Result<(StatusCode, Json<Department>), AppError> {
    user.require_admin()?;
    let input = form.validate()?;

    if state
        .repo
        .get_faculty(faculty_id)
        .await
        .or_internal("Failed to create department")?
        .is_none()
    {
        return Err(AppError::not_found("Faculty not found"));
    }

    let department = state
        .repo
        .create_department(faculty_id, &input)
        .await
        .or_internal("Failed to create department")?;
    tracing::info!(department_id = department.id, "department created");
    Ok((StatusCode::CREATED, Json(department)))
}

#[utoipa::path(
    get,
    path = "/api/admin/departments/{department_id}",
    params(("department_id" = i64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Found", body = Department),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_department(
    user: AuthUser,
    State(state): State<AppState>,
    Path(department_id): Path<i64>,
) -> Result<Json<Department>, AppError> {
    user.require_admin()?;
    state
        .repo
        .get_department(department_id)
        .await
        .or_internal("Failed to fetch department")?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Department not found"))
}

/// update_department
///
/// [Admin Route] Replaces the department's name, short name and description.
#[utoipa::path(
    put,
    path = "/api/admin/departments/{department_id}",
    params(("department_id" = i64, Path, description = "Department ID")),
    request_body = DepartmentForm,
    responses(
        (status = 200, description = "Updated", body = Department),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_department(
    user: AuthUser,
    State(state): State<AppState>,
    Path(department_id): Path<i64>,
    AppJson(form): AppJson<DepartmentForm>,
) -> Result<Json<Department>, AppError> {
    user.require_admin()?;
    let input = form.validate()?;

    state
        .repo
        .update_department(department_id, &input)
        .await
        .or_internal("Failed to update department")?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Department not found"))
}

#[utoipa::path(
    delete,
    path = "/api/admin/departments/{department_id}",
    params(("department_id" = i64, Path, description = "Department ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_department(
    user: AuthUser,
    State(state): State<AppState>,
    Path(department_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    user.require_admin()?;
    if state
        .repo
        .delete_department(department_id)
        .await
        .or_internal("Failed to delete department")?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Department not found"))
    }
}

// --- Courses (admin) ---

#[utoipa::path(
    post,
    path = "/api/admin/levels/{level_id}/courses",
    params(("level_id" = i64, Path, description = "Academic level ID")),
    request_body = CourseForm,
    responses(
        (status = 201, description = "Created", body = Course),
        (status = 400, description = "Missing fields", body = ErrorBody)
    )
)]
pub async fn create_course(
    user: AuthUser,
    State(state): State<AppState>,
    Path(level_id): Path<i64>,
    AppJson(form): AppJson<CourseForm>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    user.require_admin()?;
    let input = form.validate()?;

    let course = state
        .repo
        .create_course(level_id, &input)
        .await
        .or_internal("Failed to create course")?;
    tracing::info!(course_id = course.id, "course created");
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    get,
    path = "/api/admin/courses/{course_id}",
    params(("course_id" = i64, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Found", body = Course),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_admin_course(
    user: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
) -> Result<Json<Course>, AppError> {
    user.require_admin()?;
    state
        .repo
        .get_course(course_id)
        .await
        .or_internal("Failed to fetch course")?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Course not found"))
}

#[utoipa::path(
    put,
    path = "/api/admin/courses/{course_id}",
    params(("course_id" = i64, Path, description = "Course ID")),
    request_body = CourseForm,
    responses(
        (status = 200, description = "Updated", body = Course),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_course(
    user: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    AppJson(form): AppJson<CourseForm>,
) -> Result<Json<Course>, AppError> {
    user.require_admin()?;
    let input = form.validate()?;

    state
        .repo
        .update_course(course_id, &input)
        .await
        .or_internal("Failed to update course")?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Course not found"))
}

#[utoipa::path(
    delete,
    path = "/api/admin/courses/{course_id}",
    params(("course_id" = i64, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_course(
    user: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    user.require_admin()?;
    if state
        .repo
        .delete_course(course_id)
        .await
        .or_internal("Failed to delete course")?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Course not found"))
    }
}
