use serde_json::Value;

use crate::{
    audit,
    db::DbPool,
    dto::admin::{SystemSettings, UpdateSystemSettings},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

const SETTINGS_KEY: &str = "general";

/// Stored settings, or the defaults when none were saved. An unreadable row
/// falls back to the defaults as well.
pub async fn load_system_settings(pool: &DbPool) -> AppResult<SystemSettings> {
    let row: Option<(Value,)> = sqlx::query_as("SELECT value FROM system_settings WHERE key = $1")
        .bind(SETTINGS_KEY)
        .fetch_optional(pool)
        .await?;

    Ok(match row {
        Some((value,)) => serde_json::from_value(value).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "stored system settings are unreadable, using defaults");
            SystemSettings::default()
        }),
        None => SystemSettings::default(),
    })
}

pub async fn get_settings(state: &AppState) -> AppResult<ApiResponse<SystemSettings>> {
    let settings = load_system_settings(&state.pool).await?;
    Ok(ApiResponse::success("System settings", settings, Some(Meta::empty())))
}

pub async fn update_settings(
    state: &AppState,
    admin: &AuthUser,
    patch: UpdateSystemSettings,
) -> AppResult<ApiResponse<SystemSettings>> {
    let current = load_system_settings(&state.pool).await?;
    let updated = current.apply(patch).map_err(AppError::BadRequest)?;
    let value = serde_json::to_value(&updated).map_err(AppError::internal)?;

    sqlx::query(
        r#"
        INSERT INTO system_settings (key, value, updated_at)
        VALUES ($1, $2, now())
        ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
        "#,
    )
    .bind(SETTINGS_KEY)
    .bind(&value)
    .execute(&state.pool)
    .await?;

    tracing::info!(admin_id = %admin.user_id, "system settings updated");
    audit::record(
        &state.pool,
        admin.user_id,
        "settings_update",
        "system_settings",
        value,
    )
    .await;

    Ok(ApiResponse::success("System settings updated", updated, Some(Meta::empty())))
}
