use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    cart::{Cart, CartError, CartLine},
    types::CatalogKind,
};

#[derive(Deserialize, Debug, ToSchema)]
pub struct AddCartItemRequest {
    pub service_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub custom_price: Option<i64>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ToggleCartItemRequest {
    pub service_id: String,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: Option<i32>,
    pub custom_price: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub catalog: CatalogKind,
    pub items: Vec<CartLine>,
    pub total: i64,
}

impl TryFrom<&Cart> for CartView {
    type Error = CartError;

    fn try_from(cart: &Cart) -> Result<Self, Self::Error> {
        Ok(Self {
            catalog: cart.kind(),
            items: cart.lines().to_vec(),
            total: cart.total()?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ToggleResult {
    pub selected: bool,
    pub cart: CartView,
}
