//! Requests for the four per-category services. The tables share one shape,
//! so the SQL is assembled from a fixed table name per [`DomainKind`].

use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit,
    dto::domain::{
        AdminDomainRequestList, DomainKind, DomainRequestBody, DomainRequestList,
        DomainRequestWithUser, ServiceDetails, UpdateDomainStatusRequest,
    },
    error::{AppError, AppResult, is_unique_violation},
    middleware::auth::AuthUser,
    models::DomainRequest,
    response::{ApiResponse, Meta},
    routes::params::{Pagination, SortOrder, StatusListQuery},
    services::notification_service::{Topic, notify, notify_admins},
    state::AppState,
    types::DomainStatus,
};

fn tracking_column(kind: DomainKind, alias: &str) -> String {
    match kind {
        DomainKind::Business => format!("{alias}tracking_number"),
        _ => "NULL::text AS tracking_number".to_string(),
    }
}

fn returning_columns(kind: DomainKind, alias: &str) -> String {
    format!(
        "{alias}id, {alias}user_id, {alias}service_type, {alias}details, {alias}status, {}, {alias}created_at, {alias}updated_at",
        tracking_column(kind, alias)
    )
}

/// `BR-<unix millis>-<first 8 chars of the user id, upper-case>`.
pub fn tracking_number(user_id: Uuid, now: chrono::DateTime<Utc>) -> String {
    let simple = user_id.simple().to_string();
    format!("BR-{}-{}", now.timestamp_millis(), simple[..8].to_uppercase())
}

pub async fn create_request(
    state: &AppState,
    user: &AuthUser,
    kind: DomainKind,
    body: DomainRequestBody,
) -> AppResult<ApiResponse<DomainRequest>> {
    let details = ServiceDetails::parse(kind, body)?;
    let details_json = details.details_json()?;
    let table = kind.table();
    let columns = returning_columns(kind, "");

    let inserted = match kind {
        DomainKind::Business => {
            let sql = format!(
                "INSERT INTO {table} (user_id, service_type, details, status, tracking_number) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING {columns}"
            );
            sqlx::query_as::<_, DomainRequest>(&sql)
                .bind(user.user_id)
                .bind(details.service_type())
                .bind(&details_json)
                .bind(DomainStatus::Pending.as_str())
                .bind(tracking_number(user.user_id, Utc::now()))
                .fetch_one(&state.pool)
                .await
        }
        _ => {
            let sql = format!(
                "INSERT INTO {table} (user_id, service_type, details, status) \
                 VALUES ($1, $2, $3, $4) RETURNING {columns}"
            );
            sqlx::query_as::<_, DomainRequest>(&sql)
                .bind(user.user_id)
                .bind(details.service_type())
                .bind(&details_json)
                .bind(DomainStatus::Pending.as_str())
                .fetch_one(&state.pool)
                .await
        }
    };

    let request = match inserted {
        Ok(row) => row,
        Err(err) if is_unique_violation(&err) => {
            return Err(AppError::bad_request(
                "A request was just submitted, please try again",
            ));
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(
        request_id = %request.id,
        user_id = %user.user_id,
        table,
        service_type = %request.service_type,
        "service request submitted"
    );

    let title = format!("{} request received", kind.label());
    let message = match &request.tracking_number {
        Some(tracking) => format!(
            "Your {} request has been received. Tracking number: {tracking}",
            request.service_type
        ),
        None => format!("Your {} request has been received.", request.service_type),
    };
    notify(&state.pool, user.user_id, Topic::Service, "service_request", &title, &message).await;
    notify_admins(
        &state.pool,
        "new_service_request",
        &format!("New {} request", kind.label()),
        &format!("A new {} request was submitted.", request.service_type),
    )
    .await;
    audit::record(
        &state.pool,
        user.user_id,
        "service_request_create",
        table,
        serde_json::json!({ "id": request.id, "service_type": request.service_type }),
    )
    .await;

    Ok(ApiResponse::success("Request submitted", request, Some(Meta::empty())))
}

pub async fn list_my_requests(
    state: &AppState,
    user: &AuthUser,
    kind: DomainKind,
    pagination: Pagination,
) -> AppResult<ApiResponse<DomainRequestList>> {
    let (page, limit, offset) = pagination.normalize();
    let table = kind.table();

    let sql = format!(
        "SELECT {} FROM {table} WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        returning_columns(kind, "")
    );
    let items = sqlx::query_as::<_, DomainRequest>(&sql)
        .bind(user.user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;

    let count_sql = format!("SELECT COUNT(*) FROM {table} WHERE user_id = $1");
    let (total,): (i64,) = sqlx::query_as(&count_sql)
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;

    Ok(ApiResponse::success(
        "My requests",
        DomainRequestList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn list_all_requests(
    state: &AppState,
    kind: DomainKind,
    query: StatusListQuery,
) -> AppResult<ApiResponse<AdminDomainRequestList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let status = query
        .status_filter()
        .map(|s| s.parse::<DomainStatus>())
        .transpose()?;
    let direction = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    let table = kind.table();

    let sql = format!(
        r#"
        SELECT {}, u.email AS user_email, u.first_name AS user_first_name,
               u.last_name AS user_last_name, u.phone AS user_phone
        FROM {table} r
        JOIN users u ON u.id = r.user_id
        WHERE ($1::text IS NULL OR r.status = $1)
        ORDER BY r.created_at {direction}
        LIMIT $2 OFFSET $3
        "#,
        returning_columns(kind, "r.")
    );
    let items = sqlx::query_as::<_, DomainRequestWithUser>(&sql)
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;

    let count_sql = format!("SELECT COUNT(*) FROM {table} WHERE ($1::text IS NULL OR status = $1)");
    let (total,): (i64,) = sqlx::query_as(&count_sql)
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&state.pool)
        .await?;

    Ok(ApiResponse::success(
        "Requests",
        AdminDomainRequestList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn update_request_status(
    state: &AppState,
    admin: &AuthUser,
    kind: DomainKind,
    id: Uuid,
    payload: UpdateDomainStatusRequest,
) -> AppResult<ApiResponse<DomainRequest>> {
    let status: DomainStatus = payload.status.trim().to_lowercase().parse()?;
    let table = kind.table();

    let mut tx = state.pool.begin().await?;
    let current: Option<(String,)> =
        sqlx::query_as(&format!("SELECT status FROM {table} WHERE id = $1 FOR UPDATE"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let (current,) = current.ok_or(AppError::NotFound)?;
    let current: DomainStatus = current
        .parse()
        .map_err(|e| AppError::internal(format!("stored request status: {e}")))?;
    if !current.can_transition_to(status) {
        return Err(AppError::bad_request(format!(
            "Cannot change request status from {current} to {status}"
        )));
    }

    let sql = format!(
        "UPDATE {table} SET status = $1, updated_at = now() WHERE id = $2 RETURNING {}",
        returning_columns(kind, "")
    );
    let request = sqlx::query_as::<_, DomainRequest>(&sql)
        .bind(status.as_str())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(request_id = %id, table, status = %status, "service request status updated");
    notify(
        &state.pool,
        request.user_id,
        Topic::Service,
        "service_status",
        &format!("{} request updated", kind.label()),
        &format!(
            "Your {} request is now {}.",
            request.service_type,
            status.as_str().replace('_', " ")
        ),
    )
    .await;
    audit::record(
        &state.pool,
        admin.user_id,
        "service_request_status_update",
        table,
        serde_json::json!({ "id": id, "status": status }),
    )
    .await;

    Ok(ApiResponse::success("Request status updated", request, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn tracking_number_format() {
        let user_id = Uuid::parse_str("3f2a9c1e-0000-4000-8000-000000000000").expect("uuid");
        let now = Utc.timestamp_millis_opt(1_760_000_000_123).single().expect("time");
        assert_eq!(tracking_number(user_id, now), "BR-1760000000123-3F2A9C1E");
    }

    #[test]
    fn only_business_selects_tracking_number() {
        assert!(returning_columns(DomainKind::Business, "r.").contains("r.tracking_number"));
        assert!(returning_columns(DomainKind::Kra, "").contains("NULL::text AS tracking_number"));
    }
}
