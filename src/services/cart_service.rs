use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    cart::{Cart, CartLine},
    dto::cart::{AddCartItemRequest, CartView, ToggleCartItemRequest, ToggleResult, UpdateCartItemRequest},
    entity::cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::ApiResponse,
    state::AppState,
    types::CatalogKind,
};

/// Rebuild the user's cart for one catalog from `cart_items`.
pub async fn load_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid, kind: CatalogKind) -> AppResult<Cart> {
    let rows = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .filter(CartCol::Catalog.eq(kind.as_str()))
        .order_by_asc(CartCol::CreatedAt)
        .all(conn)
        .await?;
    Ok(Cart::from_rows(
        kind,
        rows.into_iter()
            .map(|row| (row.service_id, row.quantity, row.custom_price)),
    ))
}

async fn save_line(state: &AppState, user_id: Uuid, kind: CatalogKind, line: &CartLine) -> AppResult<()> {
    let active = CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        catalog: Set(kind.as_str().to_string()),
        service_id: Set(line.service_id.clone()),
        quantity: Set(line.quantity),
        custom_price: Set(line.custom_price),
        created_at: NotSet,
        updated_at: Set(Utc::now().into()),
    };

    CartItems::insert(active)
        .on_conflict(
            OnConflict::columns([CartCol::UserId, CartCol::Catalog, CartCol::ServiceId])
                .update_columns([CartCol::Quantity, CartCol::CustomPrice, CartCol::UpdatedAt])
                .to_owned(),
        )
        .exec(&state.orm)
        .await?;
    Ok(())
}

async fn delete_line(state: &AppState, user_id: Uuid, kind: CatalogKind, service_id: &str) -> AppResult<()> {
    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user_id))
        .filter(CartCol::Catalog.eq(kind.as_str()))
        .filter(CartCol::ServiceId.eq(service_id))
        .exec(&state.orm)
        .await?;
    Ok(())
}

pub async fn get_cart(state: &AppState, user: &AuthUser, kind: CatalogKind) -> AppResult<ApiResponse<CartView>> {
    let cart = load_cart(&state.orm, user.user_id, kind).await?;
    Ok(ApiResponse::success("Cart", CartView::try_from(&cart)?, None))
}

pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    kind: CatalogKind,
    payload: AddCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    let mut cart = load_cart(&state.orm, user.user_id, kind).await?;
    let line = cart
        .add(payload.service_id.trim(), payload.quantity, payload.custom_price)?
        .clone();
    save_line(state, user.user_id, kind, &line).await?;

    tracing::debug!(user_id = %user.user_id, catalog = %kind, service_id = %line.service_id, "cart item saved");
    Ok(ApiResponse::success("Cart updated", CartView::try_from(&cart)?, None))
}

pub async fn toggle_item(
    state: &AppState,
    user: &AuthUser,
    kind: CatalogKind,
    payload: ToggleCartItemRequest,
) -> AppResult<ApiResponse<ToggleResult>> {
    let service_id = payload.service_id.trim();
    let mut cart = load_cart(&state.orm, user.user_id, kind).await?;
    let selected = cart.toggle(service_id)?;
    match cart.line(service_id) {
        Some(line) if selected => save_line(state, user.user_id, kind, line).await?,
        _ => delete_line(state, user.user_id, kind, service_id).await?,
    }

    Ok(ApiResponse::success(
        if selected { "Service selected" } else { "Service removed" },
        ToggleResult {
            selected,
            cart: CartView::try_from(&cart)?,
        },
        None,
    ))
}

pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    kind: CatalogKind,
    service_id: &str,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    if payload.quantity.is_none() && payload.custom_price.is_none() {
        return Err(AppError::bad_request("quantity or custom_price is required"));
    }

    let mut cart = load_cart(&state.orm, user.user_id, kind).await?;
    if let Some(quantity) = payload.quantity {
        cart.set_quantity(service_id, quantity)?;
    }
    if let Some(price) = payload.custom_price {
        cart.set_custom_price(service_id, price)?;
    }
    let line = cart.line(service_id).ok_or(AppError::NotFound)?;
    save_line(state, user.user_id, kind, line).await?;

    Ok(ApiResponse::success("Cart updated", CartView::try_from(&cart)?, None))
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    kind: CatalogKind,
    service_id: &str,
) -> AppResult<ApiResponse<CartView>> {
    let mut cart = load_cart(&state.orm, user.user_id, kind).await?;
    if !cart.remove(service_id) {
        return Err(AppError::NotFound);
    }
    delete_line(state, user.user_id, kind, service_id).await?;
    Ok(ApiResponse::success("Item removed", CartView::try_from(&cart)?, None))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser, kind: CatalogKind) -> AppResult<ApiResponse<CartView>> {
    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::Catalog.eq(kind.as_str()))
        .exec(&state.orm)
        .await?;
    let cart = Cart::new(kind);
    Ok(ApiResponse::success("Cart cleared", CartView::try_from(&cart)?, None))
}
