use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};

use crate::{
    dto::cart::{
        AddCartItemRequest, CartView, ToggleCartItemRequest, ToggleResult, UpdateCartItemRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::catalog::parse_catalog,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{catalog}", get(get_cart).delete(clear_cart))
        .route("/{catalog}/items", post(add_item))
        .route("/{catalog}/toggle", post(toggle_item))
        .route(
            "/{catalog}/items/{service_id}",
            put(update_item).delete(remove_item),
        )
}

#[utoipa::path(
    get,
    path = "/api/cart/{catalog}",
    params(("catalog" = String, Path, description = "business, data or website")),
    responses(
        (status = 200, description = "Cart lines and total", body = ApiResponse<CartView>),
        (status = 404, description = "Unknown catalog")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(catalog): Path<String>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let kind = parse_catalog(&catalog)?;
    let resp = cart_service::get_cart(&state, &user, kind).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/{catalog}/items",
    params(("catalog" = String, Path, description = "business, data or website")),
    request_body = AddCartItemRequest,
    responses(
        (status = 200, description = "Item added or updated", body = ApiResponse<CartView>),
        (status = 400, description = "Unknown service, bad quantity or price below minimum")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(catalog): Path<String>,
    Json(payload): Json<AddCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let kind = parse_catalog(&catalog)?;
    let resp = cart_service::add_item(&state, &user, kind, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/{catalog}/toggle",
    params(("catalog" = String, Path, description = "business, data or website")),
    request_body = ToggleCartItemRequest,
    responses(
        (status = 200, description = "Service selected or deselected", body = ApiResponse<ToggleResult>),
        (status = 400, description = "Unknown service")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn toggle_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(catalog): Path<String>,
    Json(payload): Json<ToggleCartItemRequest>,
) -> AppResult<Json<ApiResponse<ToggleResult>>> {
    let kind = parse_catalog(&catalog)?;
    let resp = cart_service::toggle_item(&state, &user, kind, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/cart/{catalog}/items/{service_id}",
    params(
        ("catalog" = String, Path, description = "business, data or website"),
        ("service_id" = String, Path, description = "Service ID")
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Line updated", body = ApiResponse<CartView>),
        (status = 400, description = "Bad quantity or price"),
        (status = 404, description = "Service not in the cart")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((catalog, service_id)): Path<(String, String)>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let kind = parse_catalog(&catalog)?;
    let resp = cart_service::update_item(&state, &user, kind, &service_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{catalog}/items/{service_id}",
    params(
        ("catalog" = String, Path, description = "business, data or website"),
        ("service_id" = String, Path, description = "Service ID")
    ),
    responses(
        (status = 200, description = "Line removed", body = ApiResponse<CartView>),
        (status = 404, description = "Service not in the cart")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((catalog, service_id)): Path<(String, String)>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let kind = parse_catalog(&catalog)?;
    let resp = cart_service::remove_item(&state, &user, kind, &service_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{catalog}",
    params(("catalog" = String, Path, description = "business, data or website")),
    responses(
        (status = 200, description = "Cart cleared", body = ApiResponse<CartView>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(catalog): Path<String>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let kind = parse_catalog(&catalog)?;
    let resp = cart_service::clear_cart(&state, &user, kind).await?;
    Ok(Json(resp))
}
