use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{error::AppError, state::AppState, tokens::decode_token, types::Role};

/// Caller identity decoded from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn ensure_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, Role::Admin)
}

pub fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::unauthorized("Invalid Authorization header"))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("Invalid Authorization scheme"))?
        .trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Missing bearer token"));
    }
    Ok(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = decode_token(&state.config.jwt_secret, token)?;
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| AppError::unauthorized("Invalid role in token"))?;
        let issued_at = DateTime::from_timestamp(claims.iat, 0)
            .ok_or_else(|| AppError::unauthorized("Invalid token"))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            role,
            issued_at,
        })
    }
}

/// An [`AuthUser`] whose admin role is confirmed against the database on every
/// request, so a demoted or deleted admin loses access before the token expires.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        ensure_admin(&user)?;

        let stored: Option<(String,)> = sqlx::query_as("SELECT role FROM users WHERE id = $1")
            .bind(user.user_id)
            .fetch_optional(&state.pool)
            .await?;
        match stored {
            Some((role,)) if role == Role::Admin.as_str() => Ok(AdminUser(user)),
            _ => {
                tracing::warn!(user_id = %user.user_id, "admin token no longer matches stored role");
                Err(AppError::Forbidden)
            }
        }
    }
}
