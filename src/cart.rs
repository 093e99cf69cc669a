use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Largest quantity a single line may carry.
pub const MAX_QUANTITY: i32 = 100;
/// Largest custom price accepted for a variable-priced service, in KES.
pub const MAX_CUSTOM_PRICE: i64 = 100_000_000;

use crate::{
    catalog::{Catalog, CatalogService, catalog},
    error::AppError,
    types::CatalogKind,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Unknown service '{0}'")]
    UnknownService(String),
    #[error("Service '{0}' is not in the cart")]
    NotInCart(String),
    #[error("quantity must be between 1 and {MAX_QUANTITY}")]
    InvalidQuantity,
    #[error("custom price for '{service_id}' must be at least {min_price}")]
    PriceBelowMinimum { service_id: String, min_price: i64 },
    #[error("custom price for '{service_id}' must be at most {MAX_CUSTOM_PRICE}")]
    PriceAboveMaximum { service_id: String },
    #[error("Service '{0}' has a fixed price")]
    FixedPrice(String),
    #[error("Cart total is too large")]
    AmountOverflow,
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::NotInCart(_) => AppError::NotFound,
            other => AppError::bad_request(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CartLine {
    pub service_id: String,
    pub name: String,
    pub price: i64,
    pub min_price: Option<i64>,
    pub quantity: i32,
    pub custom_price: Option<i64>,
}

impl CartLine {
    fn new(service: &CatalogService, quantity: i32) -> Self {
        Self {
            service_id: service.id.to_string(),
            name: service.name.to_string(),
            price: service.price,
            min_price: service.min_price,
            quantity,
            custom_price: None,
        }
    }

    pub fn unit_price(&self) -> i64 {
        self.custom_price.unwrap_or(self.price)
    }

    pub fn total(&self) -> Result<i64, CartError> {
        self.unit_price()
            .checked_mul(i64::from(self.quantity))
            .ok_or(CartError::AmountOverflow)
    }
}

/// Selected services from one catalog.
#[derive(Debug, Clone)]
pub struct Cart {
    catalog: &'static Catalog,
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(kind: CatalogKind) -> Self {
        Self {
            catalog: catalog(kind),
            lines: Vec::new(),
        }
    }

    /// Rebuild from stored rows. Rows naming services that left the catalog are dropped.
    pub fn from_rows<I>(kind: CatalogKind, rows: I) -> Self
    where
        I: IntoIterator<Item = (String, i32, Option<i64>)>,
    {
        let mut cart = Cart::new(kind);
        for (service_id, quantity, custom_price) in rows {
            let Some(service) = cart.catalog.find(&service_id) else {
                tracing::debug!(%service_id, "dropping stale cart row");
                continue;
            };
            let mut line = CartLine::new(service, quantity.clamp(1, MAX_QUANTITY));
            line.custom_price = match (service.min_price, custom_price) {
                (Some(min), Some(price)) => Some(price.clamp(min, MAX_CUSTOM_PRICE.max(min))),
                _ => None,
            };
            cart.lines.push(line);
        }
        cart
    }

    pub fn kind(&self) -> CatalogKind {
        self.catalog.kind
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, service_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.service_id == service_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total(&self) -> Result<i64, CartError> {
        self.lines.iter().try_fold(0i64, |sum, line| {
            sum.checked_add(line.total()?).ok_or(CartError::AmountOverflow)
        })
    }

    fn service(&self, service_id: &str) -> Result<&'static CatalogService, CartError> {
        self.catalog
            .find(service_id)
            .ok_or_else(|| CartError::UnknownService(service_id.to_string()))
    }

    fn line_mut(&mut self, service_id: &str) -> Result<&mut CartLine, CartError> {
        self.lines
            .iter_mut()
            .find(|l| l.service_id == service_id)
            .ok_or_else(|| CartError::NotInCart(service_id.to_string()))
    }

    /// Insert or update a line.
    pub fn add(
        &mut self,
        service_id: &str,
        quantity: i32,
        custom_price: Option<i64>,
    ) -> Result<&CartLine, CartError> {
        let service = self.service(service_id)?;
        check_quantity(quantity)?;
        if let Some(price) = custom_price {
            check_custom_price(service, price)?;
        }

        let index = match self.lines.iter().position(|l| l.service_id == service_id) {
            Some(index) => index,
            None => {
                self.lines.push(CartLine::new(service, quantity));
                self.lines.len() - 1
            }
        };
        let line = &mut self.lines[index];
        line.quantity = quantity;
        if custom_price.is_some() {
            line.custom_price = custom_price;
        }
        Ok(&self.lines[index])
    }

    /// Select the service if absent, deselect it if present. Returns whether it is now selected.
    pub fn toggle(&mut self, service_id: &str) -> Result<bool, CartError> {
        let service = self.service(service_id)?;
        if self.remove(service_id) {
            return Ok(false);
        }
        self.lines.push(CartLine::new(service, 1));
        Ok(true)
    }

    pub fn remove(&mut self, service_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.service_id != service_id);
        self.lines.len() != before
    }

    pub fn set_quantity(&mut self, service_id: &str, quantity: i32) -> Result<(), CartError> {
        check_quantity(quantity)?;
        self.line_mut(service_id)?.quantity = quantity;
        Ok(())
    }

    pub fn set_custom_price(&mut self, service_id: &str, price: i64) -> Result<(), CartError> {
        let service = self.service(service_id)?;
        check_custom_price(service, price)?;
        self.line_mut(service_id)?.custom_price = Some(price);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

fn check_quantity(quantity: i32) -> Result<(), CartError> {
    if !(1..=MAX_QUANTITY).contains(&quantity) {
        return Err(CartError::InvalidQuantity);
    }
    Ok(())
}

fn check_custom_price(service: &CatalogService, price: i64) -> Result<(), CartError> {
    match service.min_price {
        None => Err(CartError::FixedPrice(service.id.to_string())),
        Some(min) if price < min => Err(CartError::PriceBelowMinimum {
            service_id: service.id.to_string(),
            min_price: min,
        }),
        Some(_) if price > MAX_CUSTOM_PRICE => Err(CartError::PriceAboveMaximum {
            service_id: service.id.to_string(),
        }),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected_total(cart: &Cart) -> i64 {
        cart.lines()
            .iter()
            .map(|l| l.custom_price.unwrap_or(l.price) * i64::from(l.quantity))
            .sum()
    }

    #[test]
    fn fixed_plus_variable_at_minimum() {
        let mut cart = Cart::new(CatalogKind::Business);
        cart.add("kra-pin-registration", 1, None).expect("add pin");
        cart.add("ngo-registration", 1, Some(50_000)).expect("add ngo");
        assert_eq!(cart.total().expect("total"), 51_500);
    }

    #[test]
    fn total_tracks_every_operation() {
        let mut cart = Cart::new(CatalogKind::Business);
        assert_eq!(cart.total().expect("total"), 0);

        assert!(cart.toggle("kra-pin-registration").expect("toggle"));
        assert_eq!(cart.total().expect("total"), expected_total(&cart));

        cart.add("business-permit", 2, Some(12_000)).expect("add permit");
        assert_eq!(cart.total().expect("total"), 1_500 + 24_000);

        cart.set_quantity("kra-pin-registration", 3).expect("qty");
        assert_eq!(cart.total().expect("total"), 4_500 + 24_000);

        cart.set_custom_price("business-permit", 10_000).expect("price");
        assert_eq!(cart.total().expect("total"), expected_total(&cart));
        assert_eq!(cart.total().expect("total"), 4_500 + 20_000);

        assert!(!cart.toggle("kra-pin-registration").expect("untoggle"));
        assert!(cart.remove("business-permit"));
        assert!(cart.is_empty());
        assert_eq!(cart.total().expect("total"), 0);
    }

    #[test]
    fn add_existing_updates_quantity_and_keeps_price() {
        let mut cart = Cart::new(CatalogKind::Data);
        cart.add("dashboard-development", 1, Some(70_000)).expect("add");
        let line = cart.add("dashboard-development", 2, None).expect("update");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.custom_price, Some(70_000));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total().expect("total"), 140_000);
    }

    #[test]
    fn floor_constraints() {
        let mut cart = Cart::new(CatalogKind::Business);
        assert_eq!(
            cart.add("kra-pin-registration", 0, None),
            Err(CartError::InvalidQuantity)
        );
        cart.add("ngo-registration", 1, None).expect("add");
        assert_eq!(
            cart.set_custom_price("ngo-registration", 49_999),
            Err(CartError::PriceBelowMinimum {
                service_id: "ngo-registration".into(),
                min_price: 50_000
            })
        );
        assert_eq!(
            cart.set_quantity("ngo-registration", 0),
            Err(CartError::InvalidQuantity)
        );
        cart.add("kra-pin-registration", 1, None).expect("add pin");
        assert_eq!(
            cart.set_custom_price("kra-pin-registration", 2_000),
            Err(CartError::FixedPrice("kra-pin-registration".into()))
        );
    }

    #[test]
    fn quantity_and_price_ceilings() {
        let mut cart = Cart::new(CatalogKind::Business);
        cart.add("kra-pin-registration", MAX_QUANTITY, None).expect("at the cap");
        assert_eq!(
            cart.add("kra-pin-registration", MAX_QUANTITY + 1, None),
            Err(CartError::InvalidQuantity)
        );
        assert_eq!(
            cart.set_quantity("kra-pin-registration", i32::MAX),
            Err(CartError::InvalidQuantity)
        );
        cart.add("ngo-registration", 2, Some(MAX_CUSTOM_PRICE)).expect("at the cap");
        assert_eq!(
            cart.add("ngo-registration", 2, Some(i64::MAX)),
            Err(CartError::PriceAboveMaximum {
                service_id: "ngo-registration".into()
            })
        );
        assert_eq!(
            cart.set_custom_price("ngo-registration", MAX_CUSTOM_PRICE + 1),
            Err(CartError::PriceAboveMaximum {
                service_id: "ngo-registration".into()
            })
        );
        assert_eq!(cart.total(), Ok(150_000 + 2 * MAX_CUSTOM_PRICE));
    }

    #[test]
    fn stored_rows_are_clamped_to_the_ceilings() {
        let cart = Cart::from_rows(
            CatalogKind::Business,
            vec![("ngo-registration".to_string(), i32::MAX, Some(i64::MAX))],
        );
        let line = cart.line("ngo-registration").expect("ngo");
        assert_eq!(line.quantity, MAX_QUANTITY);
        assert_eq!(line.custom_price, Some(MAX_CUSTOM_PRICE));
        assert_eq!(cart.total(), Ok(i64::from(MAX_QUANTITY) * MAX_CUSTOM_PRICE));
    }

    #[test]
    fn line_total_overflow_is_an_error() {
        let line = CartLine {
            service_id: "ngo-registration".into(),
            name: "NGO Registration".into(),
            price: 50_000,
            min_price: Some(50_000),
            quantity: 2,
            custom_price: Some(i64::MAX),
        };
        assert_eq!(line.total(), Err(CartError::AmountOverflow));
    }

    #[test]
    fn unknown_and_missing_services() {
        let mut cart = Cart::new(CatalogKind::Website);
        assert_eq!(
            cart.toggle("kra-pin-registration"),
            Err(CartError::UnknownService("kra-pin-registration".into()))
        );
        assert_eq!(
            cart.set_quantity("landing-page", 2),
            Err(CartError::NotInCart("landing-page".into()))
        );
        assert!(!cart.remove("landing-page"));
    }

    #[test]
    fn from_rows_drops_stale_and_clamps() {
        let cart = Cart::from_rows(
            CatalogKind::Website,
            vec![
                ("landing-page".to_string(), 2, Some(99)),
                ("retired-service".to_string(), 1, None),
                ("ecommerce-website".to_string(), 1, Some(100)),
            ],
        );
        assert_eq!(cart.lines().len(), 2);
        let landing = cart.line("landing-page").expect("landing");
        assert_eq!(landing.custom_price, None);
        let shop = cart.line("ecommerce-website").expect("shop");
        assert_eq!(shop.custom_price, Some(120_000));
        assert_eq!(cart.total().expect("total"), 50_000 + 120_000);
    }
}
