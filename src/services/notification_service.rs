use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::notifications::{
        NotificationList, NotificationListQuery, NotificationSettings, UnreadCount,
        UpdateNotificationSettings, UpdatedCount,
    },
    entity::notifications::{ActiveModel as NotificationActive, Column as NotifCol, Entity as Notifications},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Notification,
    response::{ApiResponse, Meta},
    services::settings_service::load_system_settings,
    state::AppState,
};

/// Which user preference gates a notification.
#[derive(Debug, Clone, Copy)]
pub enum Topic {
    Payment,
    Service,
}

impl Topic {
    fn setting_column(&self) -> &'static str {
        match self {
            Topic::Payment => "payment_updates",
            Topic::Service => "service_updates",
        }
    }
}

/// Insert a notification unless the user turned the topic off. Failures are
/// logged and never reach the caller.
pub async fn notify(
    pool: &DbPool,
    user_id: Uuid,
    topic: Topic,
    kind: &str,
    title: &str,
    message: &str,
) {
    let sql = format!(
        r#"
        INSERT INTO notifications (id, user_id, type, title, message)
        SELECT $1, $2, $3, $4, $5
        WHERE COALESCE(
            (SELECT {column} FROM user_notification_settings WHERE user_id = $2),
            true
        )
        "#,
        column = topic.setting_column()
    );

    let result = sqlx::query(&sql)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(kind)
        .bind(title)
        .bind(message)
        .execute(pool)
        .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => {
            tracing::debug!(%user_id, kind, "notification suppressed by user settings");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, %user_id, kind, "notification insert failed"),
    }
}

/// Fan a notification out to every admin who keeps service updates on, when
/// the system setting asks for it.
pub async fn notify_admins(pool: &DbPool, kind: &str, title: &str, message: &str) {
    match load_system_settings(pool).await {
        Ok(settings) if !settings.notify_admin_on_new_request => return,
        Ok(_) => {}
        Err(err) => {
            tracing::warn!(error = %err, "could not load system settings for admin notification");
            return;
        }
    }

    let result = sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, type, title, message)
        SELECT gen_random_uuid(), users.id, $1, $2, $3 FROM users
        WHERE users.role = 'admin'
          AND COALESCE(
              (SELECT service_updates FROM user_notification_settings WHERE user_id = users.id),
              true
          )
        "#,
    )
    .bind(kind)
    .bind(title)
    .bind(message)
    .execute(pool)
    .await;

    if let Err(err) = result {
        tracing::warn!(error = %err, kind, "admin notification insert failed");
    }
}

pub async fn list_notifications(
    state: &AppState,
    user: &AuthUser,
    query: NotificationListQuery,
) -> AppResult<ApiResponse<NotificationList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(NotifCol::UserId.eq(user.user_id));
    if query.unread_only.unwrap_or(false) {
        condition = condition.add(NotifCol::Read.eq(false));
    }

    let finder = Notifications::find()
        .filter(condition)
        .order_by_desc(NotifCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Notification::from)
        .collect();

    Ok(ApiResponse::success(
        "Notifications",
        NotificationList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn unread_count(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UnreadCount>> {
    let count = Notifications::find()
        .filter(NotifCol::UserId.eq(user.user_id))
        .filter(NotifCol::Read.eq(false))
        .count(&state.orm)
        .await? as i64;
    Ok(ApiResponse::success("Unread count", UnreadCount { count }, None))
}

pub async fn mark_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Notification>> {
    let found = Notifications::find_by_id(id)
        .filter(NotifCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if found.read {
        return Ok(ApiResponse::success("Notification already read", found.into(), None));
    }

    let mut active: NotificationActive = found.into();
    active.read = Set(true);
    active.read_at = Set(Some(Utc::now().into()));
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::success("Notification marked as read", updated.into(), None))
}

pub async fn mark_all_read(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UpdatedCount>> {
    let result = Notifications::update_many()
        .col_expr(NotifCol::Read, Expr::value(true))
        .col_expr(NotifCol::ReadAt, Expr::current_timestamp().into())
        .filter(NotifCol::UserId.eq(user.user_id))
        .filter(NotifCol::Read.eq(false))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "All notifications marked as read",
        UpdatedCount {
            updated: result.rows_affected,
        },
        None,
    ))
}

pub async fn delete_notification(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<UpdatedCount>> {
    let result = Notifications::delete_many()
        .filter(NotifCol::Id.eq(id))
        .filter(NotifCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Notification deleted",
        UpdatedCount {
            updated: result.rows_affected,
        },
        None,
    ))
}

async fn load_settings(pool: &DbPool, user_id: Uuid) -> AppResult<NotificationSettings> {
    let row = sqlx::query_as::<_, NotificationSettings>(
        r#"
        SELECT email_notifications, sms_notifications, payment_updates, service_updates, marketing
        FROM user_notification_settings
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.unwrap_or_default())
}

pub async fn get_settings(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<NotificationSettings>> {
    let settings = load_settings(&state.pool, user.user_id).await?;
    Ok(ApiResponse::success("Notification settings", settings, None))
}

pub async fn update_settings(
    state: &AppState,
    user: &AuthUser,
    patch: UpdateNotificationSettings,
) -> AppResult<ApiResponse<NotificationSettings>> {
    let settings = load_settings(&state.pool, user.user_id).await?.apply(patch);

    sqlx::query(
        r#"
        INSERT INTO user_notification_settings
            (user_id, email_notifications, sms_notifications, payment_updates, service_updates, marketing, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        ON CONFLICT (user_id) DO UPDATE SET
            email_notifications = EXCLUDED.email_notifications,
            sms_notifications = EXCLUDED.sms_notifications,
            payment_updates = EXCLUDED.payment_updates,
            service_updates = EXCLUDED.service_updates,
            marketing = EXCLUDED.marketing,
            updated_at = now()
        "#,
    )
    .bind(user.user_id)
    .bind(settings.email_notifications)
    .bind(settings.sms_notifications)
    .bind(settings.payment_updates)
    .bind(settings.service_updates)
    .bind(settings.marketing)
    .execute(&state.pool)
    .await?;

    Ok(ApiResponse::success("Notification settings updated", settings, None))
}
