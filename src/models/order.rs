use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::coupon::Coupon;

/// Enum representing the possible statuses of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Confirmed,
    Processing,
    Paid,
    Failed,
}

/// Enum representing the payment state the backend reports for an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

/// Enum representing the possible delivery types of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryType {
    Home,
    Pickup,
    Locker,
}

/// A single line item within an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product the line refers to.
    pub product_id: Uuid,

    /// Display name of the product.
    pub product_name: String,

    /// Units ordered. Always positive.
    pub quantity: u32,

    /// Price per unit. Never negative.
    pub unit_price: Decimal,

    /// Line subtotal: `unit_price * quantity`.
    pub subtotal: Decimal,
}

impl OrderItem {
    pub fn new(product_id: Uuid, product_name: String, quantity: u32, unit_price: Decimal) -> Self {
        let subtotal = unit_price * Decimal::from(quantity);
        Self {
            product_id,
            product_name,
            quantity,
            unit_price,
            subtotal,
        }
    }

    /// Whether the stored subtotal matches the quantity and unit price.
    pub fn line_consistent(&self) -> bool {
        self.subtotal == self.unit_price * Decimal::from(self.quantity)
    }
}

/// An order as the backend order service reports it.
///
/// All amounts share one fixed currency; the intent carries the currency
/// code used for payment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique identifier for the order.
    pub id: Uuid,

    /// Human-facing order number.
    pub order_number: String,

    /// Sum of line subtotals before tax, shipping and discounts.
    pub subtotal: Decimal,

    /// Tax charged on the order.
    pub tax: Decimal,

    /// Shipping cost charged on the order.
    pub shipping_value: Decimal,

    /// Discount applied to the order. Never exceeds `subtotal`.
    pub discounts: Decimal,

    /// Grand total: `max(0, subtotal + tax + shipping_value - discounts)`.
    pub total: Decimal,

    /// Current status of the order.
    pub status: OrderStatus,

    /// Payment state the backend reports for the order.
    pub payment_status: PaymentStatus,

    /// Ordered line items.
    #[serde(default)]
    pub items: Vec<OrderItem>,

    /// Coupon applied to the order, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_coupon: Option<Coupon>,

    /// Timestamp when the order was created.
    pub created_at: DateTime<Utc>,

    /// Timestamp when the order was last updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Recomputes `total` from the monetary breakdown, clamping at zero.
    pub fn recompute_total(&mut self) {
        let raw = self.subtotal + self.tax + self.shipping_value - self.discounts;
        self.total = raw.max(Decimal::ZERO);
    }

    /// Whether the monetary breakdown satisfies the order invariants:
    /// `total == max(0, subtotal + tax + shipping_value - discounts)` and
    /// `discounts <= subtotal`.
    pub fn totals_consistent(&self) -> bool {
        let expected = (self.subtotal + self.tax + self.shipping_value - self.discounts)
            .max(Decimal::ZERO);
        self.total == expected && self.discounts <= self.subtotal
    }

    /// Whether payment has completed for this order.
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

fn default_page_size() -> u64 {
    10
}

/// One page of the backend order listing envelope.
///
/// Every metadata field is optional on the wire; absent fields fall back
/// to page 0, size 10, zero pages, zero elements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    #[serde(default)]
    pub content: Vec<Order>,

    #[serde(default)]
    pub number: u64,

    #[serde(default = "default_page_size")]
    pub size: u64,

    #[serde(default)]
    pub total_pages: u64,

    #[serde(default)]
    pub total_elements: u64,
}

impl Default for OrderPage {
    fn default() -> Self {
        Self {
            content: Vec::new(),
            number: 0,
            size: default_page_size(),
            total_pages: 0,
            total_elements: 0,
        }
    }
}

/// Helper function to create a valid order for test setups.
#[cfg(test)]
pub(crate) fn create_valid_order() -> Order {
    use rust_decimal_macros::dec;

    let item = OrderItem::new(Uuid::new_v4(), "Widget Pro".to_string(), 3, dec!(15.00));
    let mut order = Order {
        id: Uuid::new_v4(),
        order_number: "ORD-10001".to_string(),
        subtotal: dec!(45.00),
        tax: dec!(3.60),
        shipping_value: dec!(5.00),
        discounts: dec!(0.00),
        total: Decimal::ZERO,
        status: OrderStatus::Created,
        payment_status: PaymentStatus::Pending,
        items: vec![item],
        applied_coupon: None,
        created_at: Utc::now(),
        updated_at: None,
    };
    order.recompute_total();
    order
}
