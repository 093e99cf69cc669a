use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::service_requests::{
        CreateServiceRequest, PayServiceRequestResponse, PaymentDetails, ServiceRequestList,
        ServiceRequestWithItems,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::ServiceRequest,
    response::{ApiResponse, Created},
    routes::params::StatusListQuery,
    services::service_request_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_requests).post(create_request))
        .route("/{id}", get(get_request))
        .route("/{id}/pay", post(pay_request))
        .route("/{id}/cancel", post(cancel_request))
}

#[utoipa::path(
    post,
    path = "/api/service-requests",
    request_body = CreateServiceRequest,
    responses(
        (status = 201, description = "Request created from the cart", body = ApiResponse<ServiceRequestWithItems>),
        (status = 400, description = "Empty cart or invalid contact details")
    ),
    security(("bearer_auth" = [])),
    tag = "Service Requests"
)]
pub async fn create_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateServiceRequest>,
) -> AppResult<Created<ServiceRequestWithItems>> {
    let resp = service_request_service::create_request(&state, &user, payload).await?;
    Ok(Created(resp))
}

#[utoipa::path(
    get,
    path = "/api/service-requests",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Caller's service requests", body = ApiResponse<ServiceRequestList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Service Requests"
)]
pub async fn list_requests(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StatusListQuery>,
) -> AppResult<Json<ApiResponse<ServiceRequestList>>> {
    let resp = service_request_service::list_my_requests(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/service-requests/{id}",
    params(("id" = Uuid, Path, description = "Service request ID")),
    responses(
        (status = 200, description = "Request with its items", body = ApiResponse<ServiceRequestWithItems>),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Service Requests"
)]
pub async fn get_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ServiceRequestWithItems>>> {
    let resp = service_request_service::get_my_request(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/service-requests/{id}/pay",
    params(("id" = Uuid, Path, description = "Service request ID")),
    request_body = PaymentDetails,
    responses(
        (status = 201, description = "Payment recorded", body = ApiResponse<PayServiceRequestResponse>),
        (status = 400, description = "Invalid details, not awaiting payment, or a payment is in progress"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Service Requests"
)]
pub async fn pay_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(details): Json<PaymentDetails>,
) -> AppResult<Created<PayServiceRequestResponse>> {
    let resp = service_request_service::pay_request(&state, &user, id, details).await?;
    Ok(Created(resp))
}

#[utoipa::path(
    post,
    path = "/api/service-requests/{id}/cancel",
    params(("id" = Uuid, Path, description = "Service request ID")),
    responses(
        (status = 200, description = "Request cancelled", body = ApiResponse<ServiceRequest>),
        (status = 400, description = "Request is no longer awaiting payment"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Service Requests"
)]
pub async fn cancel_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ServiceRequest>>> {
    let resp = service_request_service::cancel_request(&state, &user, id).await?;
    Ok(Json(resp))
}
