use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Discount strategies a coupon can carry.
///
/// The backend may introduce kinds this client does not know about;
/// those decode as `Unknown` and yield a zero discount instead of
/// failing the checkout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    Percentage,
    Fixed,
    #[serde(other)]
    Unknown,
}

/// A coupon descriptor as attached to an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    /// Coupon code as entered by the customer.
    pub code: String,

    /// How the discount is computed from the subtotal.
    #[serde(rename = "type")]
    pub kind: DiscountKind,

    /// Percentage in [0,100] for `Percentage`, absolute amount for `Fixed`.
    pub value: Decimal,
}

impl Coupon {
    pub fn new(code: impl Into<String>, kind: DiscountKind, value: Decimal) -> Self {
        Self {
            code: code.into(),
            kind,
            value,
        }
    }
}
