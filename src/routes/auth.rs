use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
    routing::{get, post},
};

use crate::{
    dto::auth::{
        AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, ForgotPasswordResponse,
        LoginRequest, RegisterRequest, ResetPasswordRequest, SuccessResponse,
        ValidateResetTokenRequest, ValidateResetTokenResponse, VerifyTokenRequest,
        VerifyTokenResponse,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::UserProfile,
    response::{ApiResponse, Created},
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/validate-reset-token", post(validate_reset_token))
        .route("/reset-password", post(reset_password))
        .route("/change-password", post(change_password))
        .route("/verify-token", post(verify_token))
        .route("/me", get(me))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register user", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Validation failed or email already registered"),
        (status = 403, description = "Registrations are closed")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Created<AuthResponse>> {
    let resp = auth_service::register_user(&state, payload).await?;
    Ok(Created(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Email and password are required"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let resp = auth_service::login_user(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Same answer whether or not the email exists", body = ApiResponse<ForgotPasswordResponse>)
    ),
    tag = "Auth"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<ForgotPasswordResponse>>> {
    let resp = auth_service::forgot_password(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/validate-reset-token",
    request_body = ValidateResetTokenRequest,
    responses(
        (status = 200, description = "Token is valid", body = ApiResponse<ValidateResetTokenResponse>),
        (status = 400, description = "Invalid or expired reset token")
    ),
    tag = "Auth"
)]
pub async fn validate_reset_token(
    State(state): State<AppState>,
    Json(payload): Json<ValidateResetTokenRequest>,
) -> AppResult<Json<ApiResponse<ValidateResetTokenResponse>>> {
    let resp = auth_service::validate_reset_token(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = ApiResponse<SuccessResponse>),
        (status = 400, description = "Invalid or expired reset token")
    ),
    tag = "Auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<SuccessResponse>>> {
    let resp = auth_service::reset_password(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<SuccessResponse>),
        (status = 401, description = "Current password is incorrect")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<SuccessResponse>>> {
    let resp = auth_service::change_password(&state, &user, payload).await?;
    Ok(Json(resp))
}

/// Token from a `{ "token": ... }` body, falling back to the bearer header.
fn token_from_request(headers: &HeaderMap, body: &Bytes) -> AppResult<Option<String>> {
    if !body.iter().all(u8::is_ascii_whitespace) {
        let payload: VerifyTokenRequest = serde_json::from_slice(body)
            .map_err(|e| AppError::bad_request(format!("Invalid JSON body: {e}")))?;
        if payload.token.as_deref().is_some_and(|t| !t.trim().is_empty()) {
            return Ok(payload.token);
        }
    }

    Ok(headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string()))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-token",
    request_body(content = VerifyTokenRequest, description = "Optional; the bearer header is used otherwise"),
    responses(
        (status = 200, description = "Token is valid", body = ApiResponse<VerifyTokenResponse>),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    tag = "Auth"
)]
pub async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<VerifyTokenResponse>>> {
    let token = token_from_request(&headers, &body)?;
    let resp = auth_service::verify_token(&state, token).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserProfile>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = auth_service::current_user(&state, &user).await?;
    Ok(Json(resp))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn body_token_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        let body = Bytes::from_static(br#"{"token":"from-body"}"#);
        assert_eq!(
            token_from_request(&headers, &body).expect("token"),
            Some("from-body".to_string())
        );
    }

    #[test]
    fn empty_body_falls_back_to_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(
            token_from_request(&headers, &Bytes::new()).expect("token"),
            Some("abc".to_string())
        );
        assert_eq!(
            token_from_request(&headers, &Bytes::from_static(b"{}")).expect("token"),
            Some("abc".to_string())
        );
        assert_eq!(token_from_request(&HeaderMap::new(), &Bytes::new()).expect("none"), None);
    }

    #[test]
    fn malformed_body_is_rejected() {
        assert!(token_from_request(&HeaderMap::new(), &Bytes::from_static(b"{not json")).is_err());
    }
}
