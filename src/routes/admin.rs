use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{
            Activity, AdminPaymentList, AdminPaymentQuery, DashboardStats, InvoiceList,
            RecentActivityQuery, RevenueReport, SystemSettings, UpdateSystemSettings,
        },
        service_requests::{ServiceRequestList, UpdateServiceRequestStatus},
        users::{UpdateRoleRequest, UserList, UserListQuery},
    },
    error::AppResult,
    middleware::auth::AdminUser,
    models::{ServiceRequest, UserProfile},
    response::ApiResponse,
    routes::params::{Pagination, StatusListQuery},
    services::{admin_service, service_request_service, settings_service, user_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard-stats", get(dashboard_stats))
        .route("/recent-activities", get(recent_activities))
        .route("/payments", get(list_payments))
        .route("/invoices", get(invoices))
        .route("/reports/revenue", get(revenue_report))
        .route("/settings", get(get_settings).put(update_settings))
        .route("/users", get(list_users))
        .route("/users/{id}/role", put(update_user_role))
        .route("/service-requests", get(list_service_requests))
        .route("/service-requests/{id}/status", put(update_service_request_status))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard-stats",
    responses(
        (status = 200, description = "Dashboard counters", body = ApiResponse<DashboardStats>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    let resp = admin_service::dashboard_stats(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/recent-activities",
    params(("limit" = Option<i64>, Query, description = "Default 10, max 50")),
    responses(
        (status = 200, description = "Latest requests, payments and registrations", body = ApiResponse<Vec<Activity>>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn recent_activities(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<RecentActivityQuery>,
) -> AppResult<Json<ApiResponse<Vec<Activity>>>> {
    let resp = admin_service::recent_activities(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/payments",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by payment status"),
        ("payment_method" = Option<String>, Query, description = "Filter by payment method")
    ),
    responses(
        (status = 200, description = "All payments with the payer's email", body = ApiResponse<AdminPaymentList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<AdminPaymentQuery>,
) -> AppResult<Json<ApiResponse<AdminPaymentList>>> {
    let resp = admin_service::list_payments(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/invoices",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Invoices for successful payments", body = ApiResponse<InvoiceList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn invoices(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<InvoiceList>>> {
    let resp = admin_service::invoices(&state, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/reports/revenue",
    responses(
        (status = 200, description = "Revenue by month and by service type", body = ApiResponse<RevenueReport>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn revenue_report(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<ApiResponse<RevenueReport>>> {
    let resp = admin_service::revenue_report(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/settings",
    responses(
        (status = 200, description = "System settings", body = ApiResponse<SystemSettings>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_settings(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<ApiResponse<SystemSettings>>> {
    let resp = settings_service::get_settings(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/settings",
    request_body = UpdateSystemSettings,
    responses(
        (status = 200, description = "Settings updated", body = ApiResponse<SystemSettings>),
        (status = 400, description = "Invalid setting value"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<UpdateSystemSettings>,
) -> AppResult<Json<ApiResponse<SystemSettings>>> {
    let resp = settings_service::update_settings(&state, &admin, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search email, name or company"),
        ("role" = Option<String>, Query, description = "client, admin or staff")
    ),
    responses(
        (status = 200, description = "Users", body = ApiResponse<UserList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = user_service::list_users(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = ApiResponse<UserProfile>),
        (status = 400, description = "Cannot change your own role"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_user_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = user_service::update_role(&state, &admin, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/service-requests",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "All service requests", body = ApiResponse<ServiceRequestList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_service_requests(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<StatusListQuery>,
) -> AppResult<Json<ApiResponse<ServiceRequestList>>> {
    let resp = service_request_service::list_all_requests(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/service-requests/{id}/status",
    params(("id" = Uuid, Path, description = "Service request ID")),
    request_body = UpdateServiceRequestStatus,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<ServiceRequest>),
        (status = 400, description = "Unknown status or disallowed transition"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_service_request_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateServiceRequestStatus>,
) -> AppResult<Json<ApiResponse<ServiceRequest>>> {
    let resp = service_request_service::update_request_status(&state, &admin, id, payload).await?;
    Ok(Json(resp))
}
