use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::users::{UpdateProfileRequest, UpdateRoleRequest, UserList, UserListQuery},
    entity::users::{ActiveModel as UserActive, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{User, UserProfile},
    response::{ApiResponse, Meta},
    services::auth_service::{optional_field, optional_kra_pin, optional_phone},
    state::AppState,
};

pub async fn get_profile(state: &AppState, auth: &AuthUser) -> AppResult<ApiResponse<UserProfile>> {
    let user = Users::find_by_id(auth.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Profile", user.into(), None))
}

pub async fn update_profile(
    state: &AppState,
    auth: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    let user = Users::find_by_id(auth.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: UserActive = user.into();
    if let Some(first_name) = payload.first_name {
        let first_name = first_name.trim();
        if first_name.is_empty() {
            return Err(AppError::bad_request("First name must not be empty"));
        }
        active.first_name = Set(first_name.to_string());
    }
    if let Some(last_name) = payload.last_name {
        let last_name = last_name.trim();
        if last_name.is_empty() {
            return Err(AppError::bad_request("Last name must not be empty"));
        }
        active.last_name = Set(last_name.to_string());
    }
    if payload.phone.is_some() {
        active.phone = Set(optional_phone(payload.phone)?);
    }
    if payload.company_name.is_some() {
        active.company_name = Set(optional_field(payload.company_name));
    }
    if payload.kra_pin.is_some() {
        active.kra_pin = Set(optional_kra_pin(payload.kra_pin)?);
    }
    if payload.address.is_some() {
        active.address = Set(optional_field(payload.address));
    }
    active.updated_at = Set(Utc::now().into());

    let updated = active.update(&state.orm).await?;
    Ok(ApiResponse::success("Profile updated", updated.into(), None))
}

pub async fn list_users(
    state: &AppState,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let search = optional_field(query.q).map(|q| format!("%{q}%"));
    let role = query.role.map(|r| r.as_str());

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE ($1::text IS NULL
               OR email ILIKE $1 OR first_name ILIKE $1 OR last_name ILIKE $1 OR company_name ILIKE $1)
          AND ($2::text IS NULL OR role = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(search.as_deref())
    .bind(role)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let (total,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM users
        WHERE ($1::text IS NULL
               OR email ILIKE $1 OR first_name ILIKE $1 OR last_name ILIKE $1 OR company_name ILIKE $1)
          AND ($2::text IS NULL OR role = $2)
        "#,
    )
    .bind(search.as_deref())
    .bind(role)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Users",
        UserList {
            items: users.into_iter().map(UserProfile::from).collect(),
        },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn update_role(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
    payload: UpdateRoleRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    if id == admin.user_id {
        return Err(AppError::bad_request("You cannot change your own role"));
    }

    let user = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let previous = user.role.clone();

    let mut active: UserActive = user.into();
    active.role = Set(payload.role.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    tracing::info!(admin_id = %admin.user_id, user_id = %id, role = %payload.role, "user role changed");
    audit::record(
        &state.pool,
        admin.user_id,
        "user_role_update",
        "users",
        serde_json::json!({ "user_id": id, "from": previous, "to": payload.role }),
    )
    .await;

    Ok(ApiResponse::success("User role updated", updated.into(), None))
}
