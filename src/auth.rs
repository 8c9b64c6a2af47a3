use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AppError, ResultExt},
    repository::RepositoryState,
};

pub const ADMIN_ROLE: &str = "admin";
pub const STUDENT_ROLE: &str = "student";

/// Claims
///
/// Payload of the Supabase session JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's UUID, primary key of `public.users`.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

/// AuthUser
///
/// Resolved identity of an authenticated request. The role is read from the
/// `users` table on every request, so demotions take effect immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    /// 403 unless the caller holds the admin role.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Pulls the user id out of the request: the `x-user-id` header in local mode,
/// otherwise a validated Bearer JWT. Returns None when neither is usable.
fn identify(parts: &Parts, config: &AppConfig) -> Option<Uuid> {
    if config.env == Env::Local {
        let bypass = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|id| Uuid::parse_str(id).ok());
        if bypass.is_some() {
            return bypass;
        }
    }

    let token = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))?;

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;
    // Supabase tokens carry `aud: authenticated`; identity is all we need here.
    validation.validate_aud = false;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Some(data.claims.sub),
        Err(e) => {
            tracing::debug!("rejected session token: {:?}", e.kind());
            None
        }
    }
}

async fn resolve<S>(parts: &mut Parts, state: &S) -> Result<AuthUser, AppError>
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    let repo = RepositoryState::from_ref(state);
    let config = AppConfig::from_ref(state);

    let user_id = identify(parts, &config).ok_or(AppError::Unauthorized)?;

    // A valid token for a deleted user is still rejected.
    let user = repo
        .get_user(user_id)
        .await
        .or_internal("Internal server error")?
        .ok_or(AppError::Unauthorized)?;

    Ok(AuthUser {
        id: user.id,
        role: user.role,
    })
}

/// Rejects with 401 when the caller cannot be identified, and with 500 if the role
/// lookup itself fails.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await
    }
}

/// `Option<AuthUser>` never rejects: any failure reads as an anonymous caller.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        match resolve(parts, state).await {
            Ok(user) => Ok(Some(user)),
            Err(AppError::Unauthorized) => Ok(None),
            Err(e) => {
                tracing::warn!("treating caller as anonymous: {}", e);
                Ok(None)
            }
        }
    }
}
