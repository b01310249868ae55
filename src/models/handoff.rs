use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use uuid::Uuid;

use crate::errors::CheckoutError;
use crate::models::coupon::Coupon;
use crate::models::order::{Order, OrderItem, OrderStatus, PaymentStatus};

/// Form key carrying the serialized snapshot.
const PAYLOAD_KEY: &str = "order";

/// Transient order snapshot passed from checkout to the confirmation
/// view outside the durable store.
///
/// Every field is optional on decode: the confirmation view merges this
/// snapshot with a fresh fetch and must tolerate partial data. Encoding
/// always writes the full snapshot of the order that succeeded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffPayload {
    /// Order identifier. Older producers wrote `id` instead of `orderId`.
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_value: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discounts: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<OrderItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_coupon: Option<Coupon>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Legacy embedded date string, RFC 3339. Last resort before "now"
    /// in the display-date fallback chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_date: Option<String>,
}

impl HandoffPayload {
    /// Snapshots an order at the moment checkout succeeded.
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: Some(order.id),
            order_number: Some(order.order_number.clone()),
            subtotal: Some(order.subtotal),
            tax: Some(order.tax),
            shipping_value: Some(order.shipping_value),
            discounts: Some(order.discounts),
            total: Some(order.total),
            status: Some(order.status),
            payment_status: Some(order.payment_status),
            items: order.items.clone(),
            applied_coupon: order.applied_coupon.clone(),
            created_at: Some(order.created_at),
            updated_at: order.updated_at,
            order_date: None,
        }
    }

    /// Encodes the snapshot as a URL-encoded form string under the
    /// `order` key.
    pub fn encode(&self) -> Result<String, CheckoutError> {
        let json = serde_json::to_string(self)?;
        Ok(form_urlencoded::Serializer::new(String::new())
            .append_pair(PAYLOAD_KEY, &json)
            .finish())
    }

    /// Decodes a snapshot from a URL-encoded form string.
    ///
    /// Anything that does not carry a parsable `order` value is malformed;
    /// the caller treats that as "no valid order context", not an error page.
    pub fn decode(raw: &str) -> Result<Self, CheckoutError> {
        let json = form_urlencoded::parse(raw.as_bytes())
            .find(|(key, _)| key == PAYLOAD_KEY)
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| {
                CheckoutError::Validation("Hand-off payload is missing the order snapshot".into())
            })?;

        serde_json::from_str(&json)
            .map_err(|e| CheckoutError::Validation(format!("Hand-off payload is malformed: {}", e)))
    }

    /// First available date in the snapshot: creation time, then update
    /// time, then the embedded date string.
    pub fn snapshot_date(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .or(self.updated_at)
            .or_else(|| {
                self.order_date
                    .as_deref()
                    .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                    .map(|dt| dt.with_timezone(&Utc))
            })
    }
}
