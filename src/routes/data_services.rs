use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::domain::{
        AdminDomainRequestList, DomainKind, DomainRequestBody, DomainRequestList,
        UpdateDomainStatusRequest,
    },
    error::AppResult,
    middleware::auth::{AdminUser, AuthUser},
    models::DomainRequest,
    response::{ApiResponse, Created},
    routes::params::{Pagination, StatusListQuery},
    services::domain_service,
    state::AppState,
};

const KIND: DomainKind = DomainKind::Data;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/request", post(create_request))
        .route("/my-requests", get(my_requests))
        .route("/admin/requests", get(admin_requests))
        .route("/admin/requests/{id}/status", put(update_status))
}

#[utoipa::path(
    post,
    path = "/api/data-services/request",
    request_body(content = DomainRequestBody, description = "service_type: data_analysis | data_visualization | dashboard_development | data_cleaning | predictive_modeling"),
    responses(
        (status = 201, description = "Request submitted", body = ApiResponse<DomainRequest>),
        (status = 400, description = "Unknown service type or invalid details")
    ),
    security(("bearer_auth" = [])),
    tag = "Data Services"
)]
pub async fn create_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<DomainRequestBody>,
) -> AppResult<Created<DomainRequest>> {
    let resp = domain_service::create_request(&state, &user, KIND, body).await?;
    Ok(Created(resp))
}

#[utoipa::path(
    get,
    path = "/api/data-services/my-requests",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Caller's requests, newest first", body = ApiResponse<DomainRequestList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Data Services"
)]
pub async fn my_requests(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<DomainRequestList>>> {
    let resp = domain_service::list_my_requests(&state, &user, KIND, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/data-services/admin/requests",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "All requests with contact details", body = ApiResponse<AdminDomainRequestList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Data Services"
)]
pub async fn admin_requests(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<StatusListQuery>,
) -> AppResult<Json<ApiResponse<AdminDomainRequestList>>> {
    let resp = domain_service::list_all_requests(&state, KIND, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/data-services/admin/requests/{id}/status",
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body = UpdateDomainStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<DomainRequest>),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Data Services"
)]
pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDomainStatusRequest>,
) -> AppResult<Json<ApiResponse<DomainRequest>>> {
    let resp = domain_service::update_request_status(&state, &admin, KIND, id, payload).await?;
    Ok(Json(resp))
}
