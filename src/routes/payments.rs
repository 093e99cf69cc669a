use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::payments::{
        CreatePaymentRequest, PaymentEnvelope, PaymentList, PaymentStats,
        UpdatePaymentStatusRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::{ApiResponse, Created},
    routes::params::StatusListQuery,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payments).post(create_payment))
        .route("/stats", get(payment_stats))
        .route("/seed-sample", post(seed_sample))
        .route("/{id}", get(get_payment))
        .route("/{id}/status", put(update_payment_status))
}

#[utoipa::path(
    get,
    path = "/api/payments",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by payment status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Caller's payments", body = ApiResponse<PaymentList>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StatusListQuery>,
) -> AppResult<Json<ApiResponse<PaymentList>>> {
    let resp = payment_service::list_payments(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment created", body = ApiResponse<PaymentEnvelope>),
        (status = 400, description = "Unknown service type or method, bad amount or phone")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<Created<PaymentEnvelope>> {
    let resp = payment_service::create_payment(&state, &user, payload).await?;
    Ok(Created(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/stats",
    responses(
        (status = 200, description = "Caller's payment aggregates", body = ApiResponse<PaymentStats>)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn payment_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PaymentStats>>> {
    let resp = payment_service::payment_stats(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/seed-sample",
    responses(
        (status = 201, description = "Sample payments created", body = ApiResponse<PaymentList>),
        (status = 403, description = "Disabled in production")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn seed_sample(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Created<PaymentList>> {
    let resp = payment_service::seed_sample(&state, &user).await?;
    Ok(Created(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment", body = ApiResponse<PaymentEnvelope>),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PaymentEnvelope>>> {
    let resp = payment_service::get_payment(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/payments/{id}/status",
    params(("id" = Uuid, Path, description = "Payment ID")),
    request_body = UpdatePaymentStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<PaymentEnvelope>),
        (status = 400, description = "Unknown status or disallowed transition"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn update_payment_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentStatusRequest>,
) -> AppResult<Json<ApiResponse<PaymentEnvelope>>> {
    let resp = payment_service::update_payment_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
