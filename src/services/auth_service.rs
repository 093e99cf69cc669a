use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::auth::{
        AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, ForgotPasswordResponse,
        LoginRequest, RegisterRequest, ResetPasswordRequest, SuccessResponse,
        ValidateResetTokenRequest, ValidateResetTokenResponse, VerifyTokenResponse,
    },
    error::{AppError, AppResult, is_unique_violation},
    middleware::auth::AuthUser,
    models::{User, UserProfile},
    response::{ApiResponse, Meta},
    services::settings_service::load_system_settings,
    state::AppState,
    tokens::{RESET_TOKEN_TTL_HOURS, decode_token, generate_reset_token, hash_token, issue_token},
    types::Role,
    validation::{
        is_valid_email, is_valid_kra_pin, normalize_kenyan_phone, require_non_empty,
        require_password,
    },
};

const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent.";
const INVALID_RESET_TOKEN: &str = "Invalid or expired reset token";

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(AppError::internal)
}

fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::internal("Invalid password hash"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn find_user(pool: &DbPool, id: Uuid) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

async fn find_user_by_email(pool: &DbPool, email: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trimmed optional field; blank strings count as absent.
pub fn optional_field(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn optional_phone(value: Option<String>) -> AppResult<Option<String>> {
    optional_field(value)
        .map(|raw| {
            normalize_kenyan_phone(&raw)
                .ok_or_else(|| AppError::bad_request("Invalid phone number format"))
        })
        .transpose()
}

pub fn optional_kra_pin(value: Option<String>) -> AppResult<Option<String>> {
    optional_field(value)
        .map(|raw| {
            let pin = raw.to_uppercase();
            if is_valid_kra_pin(&pin) {
                Ok(pin)
            } else {
                Err(AppError::bad_request("Invalid KRA PIN format"))
            }
        })
        .transpose()
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        return Err(AppError::bad_request("Please provide a valid email"));
    }
    require_password(&payload.password, "Password")?;
    require_non_empty(&payload.first_name, "First name")?;
    require_non_empty(&payload.last_name, "Last name")?;
    let phone = optional_phone(payload.phone)?;
    let company_name = optional_field(payload.company_name);
    let kra_pin = optional_kra_pin(payload.kra_pin)?;

    let settings = load_system_settings(&state.pool).await?;
    if !settings.allow_registrations {
        return Err(AppError::Forbidden);
    }

    if find_user_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::bad_request("Email is already registered"));
    }

    let password_hash = hash_password(&payload.password)?;
    let inserted = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, phone, company_name, kra_pin, role)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(password_hash)
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(phone)
    .bind(company_name)
    .bind(kra_pin)
    .bind(Role::Client.as_str())
    .fetch_one(&state.pool)
    .await;

    let user = match inserted {
        Ok(user) => user,
        Err(err) if is_unique_violation(&err) => {
            return Err(AppError::bad_request("Email is already registered"));
        }
        Err(err) => return Err(err.into()),
    };

    let token = issue_token(&state.config.jwt_secret, user.id, Role::Client)?;
    tracing::info!(user_id = %user.id, "user registered");
    audit::record(
        &state.pool,
        user.id,
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "User registered successfully",
        AuthResponse {
            user: user.into(),
            token,
        },
        Some(Meta::empty()),
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }

    let user = find_user_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let role = user
        .role
        .parse::<Role>()
        .map_err(|e| AppError::internal(format!("stored role: {e}")))?;
    let token = issue_token(&state.config.jwt_secret, user.id, role)?;

    audit::record(
        &state.pool,
        user.id,
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        AuthResponse {
            user: user.into(),
            token,
        },
        Some(Meta::empty()),
    ))
}

pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<ForgotPasswordResponse>> {
    let email = normalize_email(&payload.email);
    require_non_empty(&email, "Email")?;

    let mut reset_link = None;
    if let Some(user) = find_user_by_email(&state.pool, &email).await? {
        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET token_hash = EXCLUDED.token_hash, expires_at = EXCLUDED.expires_at, created_at = now()
            "#,
        )
        .bind(user.id)
        .bind(hash_token(&token))
        .bind(expires_at)
        .execute(&state.pool)
        .await?;

        if state.config.is_development() {
            let link = format!("{}/reset-password?token={token}", state.config.client_url);
            tracing::info!(user_id = %user.id, reset_link = %link, "password reset link issued");
            reset_link = Some(link);
        } else {
            tracing::info!(user_id = %user.id, "password reset email queued");
        }

        audit::record(
            &state.pool,
            user.id,
            "password_reset_requested",
            "password_reset_tokens",
            serde_json::json!({ "user_id": user.id }),
        )
        .await;
    }

    Ok(ApiResponse::success(
        FORGOT_PASSWORD_MESSAGE,
        ForgotPasswordResponse {
            success: true,
            message: FORGOT_PASSWORD_MESSAGE.to_string(),
            reset_link,
        },
        Some(Meta::empty()),
    ))
}

/// Owner of an unexpired reset token, as `(user_id, email)`.
async fn find_reset_token(pool: &DbPool, token: &str) -> AppResult<(Uuid, String)> {
    if token.trim().is_empty() {
        return Err(AppError::bad_request(INVALID_RESET_TOKEN));
    }
    let row: Option<(Uuid, String)> = sqlx::query_as(
        r#"
        SELECT u.id, u.email
        FROM password_reset_tokens t
        JOIN users u ON u.id = t.user_id
        WHERE t.token_hash = $1 AND t.expires_at > now()
        "#,
    )
    .bind(hash_token(token.trim()))
    .fetch_optional(pool)
    .await?;
    row.ok_or_else(|| AppError::bad_request(INVALID_RESET_TOKEN))
}

pub async fn validate_reset_token(
    state: &AppState,
    payload: ValidateResetTokenRequest,
) -> AppResult<ApiResponse<ValidateResetTokenResponse>> {
    let (_, email) = find_reset_token(&state.pool, &payload.token).await?;
    Ok(ApiResponse::success(
        "Reset token is valid",
        ValidateResetTokenResponse { valid: true, email },
        None,
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<SuccessResponse>> {
    require_password(&payload.new_password, "Password")?;
    let (user_id, _) = find_reset_token(&state.pool, &payload.token).await?;
    let password_hash = hash_password(&payload.new_password)?;

    let mut tx = state.pool.begin().await?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2")
        .bind(password_hash)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    let consumed = sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1 AND token_hash = $2")
        .bind(user_id)
        .bind(hash_token(payload.token.trim()))
        .execute(&mut *tx)
        .await?;
    if consumed.rows_affected() == 0 {
        // Consumed by a concurrent reset between lookup and delete.
        tx.rollback().await?;
        return Err(AppError::bad_request(INVALID_RESET_TOKEN));
    }
    tx.commit().await?;

    tracing::info!(%user_id, "password reset");
    audit::record(
        &state.pool,
        user_id,
        "password_reset",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password has been reset",
        SuccessResponse { success: true },
        None,
    ))
}

pub async fn change_password(
    state: &AppState,
    auth: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<SuccessResponse>> {
    require_non_empty(&payload.current_password, "Current password")?;
    require_password(&payload.new_password, "New password")?;
    if payload.new_password == payload.current_password {
        return Err(AppError::bad_request(
            "New password must be different from the current password",
        ));
    }

    let user = find_user(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !verify_password(&payload.current_password, &user.password_hash)? {
        return Err(AppError::unauthorized("Current password is incorrect"));
    }

    let password_hash = hash_password(&payload.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2")
        .bind(password_hash)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    audit::record(
        &state.pool,
        user.id,
        "password_change",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password changed successfully",
        SuccessResponse { success: true },
        None,
    ))
}

pub async fn verify_token(
    state: &AppState,
    token: Option<String>,
) -> AppResult<ApiResponse<VerifyTokenResponse>> {
    let token = optional_field(token).ok_or_else(|| AppError::unauthorized("No token provided"))?;
    let claims = decode_token(&state.config.jwt_secret, &token)?;
    let user = find_user(&state.pool, claims.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;

    Ok(ApiResponse::success(
        "Token is valid",
        VerifyTokenResponse {
            valid: true,
            user: user.into(),
        },
        None,
    ))
}

pub async fn current_user(state: &AppState, auth: &AuthUser) -> AppResult<ApiResponse<UserProfile>> {
    let user = find_user(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;
    Ok(ApiResponse::success("Current user", user.into(), None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("s3cret-pass").expect("hash");
        assert!(verify_password("s3cret-pass", &hash).expect("verify"));
        assert!(!verify_password("wrong-pass", &hash).expect("verify"));
    }

    #[test]
    fn optional_fields_are_trimmed_and_validated() {
        assert_eq!(optional_field(Some("  ".into())), None);
        assert_eq!(
            optional_phone(Some("+254712345678".into())).expect("phone"),
            Some("0712345678".into())
        );
        assert!(optional_phone(Some("12345".into())).is_err());
        assert_eq!(
            optional_kra_pin(Some("a123456789b".into())).expect("pin"),
            Some("A123456789B".into())
        );
        assert!(optional_kra_pin(Some("nope".into())).is_err());
        assert_eq!(optional_kra_pin(None).expect("none"), None);
    }
}
