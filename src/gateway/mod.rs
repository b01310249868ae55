use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::errors::CheckoutError;
use crate::models::order::{DeliveryType, Order, OrderPage};

pub mod http;

pub use http::HttpOrderGateway;

static COUPON_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9_-]{0,31}$").unwrap());

fn validate_non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("Shipping value must not be negative".into());
        Err(err)
    }
}

/// Request body for order creation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Address the order ships to, chosen from the customer's saved addresses.
    pub shipping_address_id: Uuid,

    /// Shipping cost quoted for the chosen delivery option.
    #[validate(custom = "validate_non_negative_decimal")]
    pub shipping_value: Decimal,

    /// Requested shipping date.
    pub shipping_date: NaiveDate,

    /// How the order is delivered.
    pub delivery_type: DeliveryType,

    /// Coupon code to apply, if the customer entered one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(regex(path = "COUPON_CODE_RE", message = "Coupon code format is invalid"))]
    pub coupon_code: Option<String>,

    /// Free-form customer notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

/// Contract over the backend order API.
///
/// Implementations must check the session precondition before any
/// network attempt and fail fast with an auth error when it is missing.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Creates an order from the request. Implementations never retry
    /// this automatically; a duplicated create risks a duplicated order.
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, CheckoutError>;

    /// Lists orders for the current session, one page at a time.
    async fn list_orders(
        &self,
        page: u64,
        size: u64,
        sort: Option<&str>,
    ) -> Result<OrderPage, CheckoutError>;

    /// Fetches a single order by id.
    async fn get_order(&self, order_id: Uuid) -> Result<Order, CheckoutError>;
}
