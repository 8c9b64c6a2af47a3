use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, STUDENT_ROLE},
    error::{AppError, AppJson, ErrorBody, ResultExt},
    models::{RegisterUserRequest, User},
};

/// Minimal view of the Supabase `/auth/v1/signup` response.
#[derive(Deserialize)]
struct SupabaseAuthResponse {
    id: Uuid,
}

/// register_user
///
/// [Public Route] Signs the user up with Supabase Auth, then mirrors the account into
/// `public.users` under the same id. Every new account is a student; admins are
/// promoted in the database.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Registered", body = User),
        (status = 400, description = "Rejected by the auth provider", body = ErrorBody)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }

    let client = reqwest::Client::new();
    let auth_url = format!("{}/auth/v1/signup", state.config.supabase_url);

    let response = client
        .post(auth_url)
        .header("apikey", &state.config.supabase_key)
        .json(&serde_json::json!({ "email": email, "password": payload.password }))
        .send()
        .await
        .or_internal("Registration failed")?;

    if !response.status().is_success() {
        // Duplicate email, weak password and the like.
        tracing::info!(status = %response.status(), "signup rejected by auth provider");
        return Err(AppError::bad_request("Registration rejected"));
    }

    let auth_user = response
        .json::<SupabaseAuthResponse>()
        .await
        .or_internal("Registration failed")?;

    let user = state
        .repo
        .create_user(User {
            id: auth_user.id,
            email,
            username: payload
                .username
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            role: STUDENT_ROLE.to_string(),
        })
        .await
        .or_internal("Registration failed")?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// get_me
///
/// [Authenticated Route] The caller's profile row.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Profile", body = User),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    )
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    state
        .repo
        .get_user(id)
        .await
        .or_internal("Failed to fetch profile")?
        .map(Json)
        .ok_or(AppError::Unauthorized)
}
