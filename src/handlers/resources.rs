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
    models::{
        BookmarkResponse, CreateResourceRequest, DownloadResponse, PendingResource,
        RejectResourceRequest, Resource, ResourceShelf, UploadUrlRequest, UploadUrlResponse,
    },
    storage,
};

/// list_course_resources
///
/// [Public Route] Approved resources of a course, one shelf per file type.
#[utoipa::path(
    get,
    path = "/api/courses/{course_id}/resources",
    params(("course_id" = i64, Path, description = "Course ID")),
    responses((status = 200, description = "Resource shelves", body = [ResourceShelf]))
)]
pub async fn list_course_resources(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
) -> Result<Json<Vec<ResourceShelf>>, AppError> {
    let resources = state
        .repo
        .list_course_resources(course_id)
        .await
        .or_internal("Failed to fetch resources")?;
    Ok(Json(ResourceShelf::group(resources)))
}

/// get_resource
///
/// [Public Route] A single approved resource. Each successful fetch is recorded in
/// the view history, attributed to the caller when signed in.
#[utoipa::path(
    get,
    path = "/api/resources/{id}",
    params(("id" = Uuid, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Found", body = Resource),
        (status = 404, description = "Missing or not approved", body = ErrorBody)
    )
)]
pub async fn get_resource(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Resource>, AppError> {
    let resource = state
        .repo
        .get_approved_resource(id)
        .await
        .or_internal("Failed to fetch resource")?
        .ok_or_else(|| AppError::not_found("Resource not found"))?;

    // A lost view row must not hide the resource.
    if let Err(e) = state.repo.record_view(id, user.map(|u| u.id)).await {
        tracing::warn!(resource_id = %id, "failed to record view: {}", e);
    }

    Ok(Json(resource))
}

/// get_upload_url
///
/// [Authenticated Route] Issues a presigned PUT URL so the client can upload the
/// file straight to the bucket. The returned key is then passed to `create_resource`.
#[utoipa::path(
    post,
    path = "/api/resources/upload-url",
    request_body = UploadUrlRequest,
    responses(
        (status = 200, description = "Upload URL generated", body = UploadUrlResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn get_upload_url(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>, AppError> {
    let key = storage::resource_key(&payload.filename);

    let upload_url = state
        .storage
        .presigned_upload_url(&key, &payload.file_type)
        .await
        .or_internal("Failed to generate upload URL")?;

    tracing::debug!(user_id = %id, key = %key, "issued upload url");
    Ok(Json(UploadUrlResponse {
        upload_url,
        resource_key: key,
    }))
}

/// create_resource
///
/// [Authenticated Route] Registers an uploaded file. New resources are pending until
/// an administrator approves them.
#[utoipa::path(
    post,
    path = "/api/resources",
    request_body = CreateResourceRequest,
    responses(
        (status = 201, description = "Submitted for review", body = Resource),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 404, description = "Unknown course", body = ErrorBody)
    )
)]
pub async fn create_resource(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateResourceRequest>,
) -> Result<(StatusCode, Json<Resource>), AppError> {
    let payload = payload.validate()?;

    if state
        .repo
        .get_course(payload.course_id)
        .await
        .or_internal("Failed to create resource")?
        .is_none()
    {
        return Err(AppError::not_found("Course not found"));
    }

    let resource = state
        .repo
        .create_resource(id, &payload)
        .await
        .or_internal("Failed to create resource")?;
    tracing::info!(resource_id = %resource.id, user_id = %id, "resource submitted");
    Ok((StatusCode::CREATED, Json(resource)))
}

/// download_resource
///
/// [Authenticated Route] Counts the download and hands back a short-lived GET URL.
#[utoipa::path(
    get,
    path = "/api/resources/{id}/download",
    params(("id" = Uuid, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Download URL", body = DownloadResponse),
        (status = 404, description = "Missing or not approved", body = ErrorBody)
    )
)]
pub async fn download_resource(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DownloadResponse>, AppError> {
    let resource = state
        .repo
        .get_approved_resource(id)
        .await
        .or_internal("Failed to download resource")?
        .ok_or_else(|| AppError::not_found("Resource not found"))?;

    let download_url = state
        .storage
        .presigned_download_url(&resource.storage_key)
        .await
        .or_internal("Failed to generate download URL")?;

    state
        .repo
        .record_download(id, user_id)
        .await
        .or_internal("Failed to download resource")?;

    Ok(Json(DownloadResponse { download_url }))
}

/// toggle_bookmark
///
/// [Authenticated Route] Bookmarks the resource, or removes the bookmark if it exists.
#[utoipa::path(
    post,
    path = "/api/resources/{id}/bookmark",
    params(("id" = Uuid, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "New bookmark state", body = BookmarkResponse),
        (status = 404, description = "Missing or not approved", body = ErrorBody)
    )
)]
pub async fn toggle_bookmark(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookmarkResponse>, AppError> {
    if state
        .repo
        .get_approved_resource(id)
        .await
        .or_internal("Failed to update bookmark")?
        .is_none()
    {
        return Err(AppError::not_found("Resource not found"));
    }

    let bookmarked = state
        .repo
        .toggle_bookmark(user_id, id)
        .await
        .or_internal("Failed to update bookmark")?;
    Ok(Json(BookmarkResponse { bookmarked }))
}

#[utoipa::path(
    get,
    path = "/api/me/bookmarks",
    responses((status = 200, description = "Bookmarked resources, newest first", body = [Resource]))
)]
pub async fn list_bookmarks(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Resource>>, AppError> {
    let bookmarks = state
        .repo
        .list_bookmarks(id)
        .await
        .or_internal("Failed to fetch bookmarks")?;
    Ok(Json(bookmarks))
}

// --- Moderation (admin) ---

/// list_pending_resources
///
/// [Admin Route] The moderation queue: unapproved, unrejected resources, oldest first.
#[utoipa::path(
    get,
    path = "/api/admin/resources/pending",
    responses(
        (status = 200, description = "Pending resources", body = [PendingResource]),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn list_pending_resources(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PendingResource>>, AppError> {
    user.require_admin()?;
    let pending = state
        .repo
        .list_pending_resources()
        .await
        .or_internal("Failed to fetch pending resources")?;
    Ok(Json(pending))
}

#[utoipa::path(
    post,
    path = "/api/admin/resources/{id}/approve",
    params(("id" = Uuid, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Approved", body = Resource),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn approve_resource(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Resource>, AppError> {
    user.require_admin()?;
    let resource = state
        .repo
        .approve_resource(id)
        .await
        .or_internal("Failed to approve resource")?
        .ok_or_else(|| AppError::not_found("Resource not found"))?;
    tracing::info!(resource_id = %id, admin_id = %user.id, "resource approved");
    Ok(Json(resource))
}

/// reject_resource
///
/// [Admin Route] Rejects a pending resource. The reason is shown to the uploader, so
/// it is required.
#[utoipa::path(
    post,
    path = "/api/admin/resources/{id}/reject",
    params(("id" = Uuid, Path, description = "Resource ID")),
    request_body = RejectResourceRequest,
    responses(
        (status = 200, description = "Rejected", body = Resource),
        (status = 400, description = "Missing reason", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn reject_resource(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<RejectResourceRequest>,
) -> Result<Json<Resource>, AppError> {
    user.require_admin()?;
    let reason = payload
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::bad_request("Rejection reason is required"))?;

    let resource = state
        .repo
        .reject_resource(id, &reason)
        .await
        .or_internal("Failed to reject resource")?
        .ok_or_else(|| AppError::not_found("Resource not found"))?;
    tracing::info!(resource_id = %id, admin_id = %user.id, "resource rejected");
    Ok(Json(resource))
}
