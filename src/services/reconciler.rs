use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::coupon::Coupon;
use crate::models::handoff::HandoffPayload;
use crate::models::order::{Order, OrderItem, OrderStatus, PaymentStatus};
use crate::services::orders::OrderWorkflow;

/// Everything the confirmation page renders for one order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfirmationView {
    pub order_id: Option<Uuid>,
    pub order_number: Option<String>,
    pub subtotal: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub shipping_value: Option<Decimal>,
    pub discounts: Option<Decimal>,
    pub total: Option<Decimal>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub items: Vec<OrderItem>,
    pub applied_coupon: Option<Coupon>,
    /// When the order was placed, as far as this view can tell.
    pub display_date: DateTime<Utc>,
    /// Whether the backend confirmed this data after the hand-off.
    pub refreshed: bool,
}

impl ConfirmationView {
    fn from_payload(payload: HandoffPayload) -> Self {
        let display_date = payload.snapshot_date().unwrap_or_else(Utc::now);
        Self {
            order_id: payload.order_id,
            order_number: payload.order_number,
            subtotal: payload.subtotal,
            tax: payload.tax,
            shipping_value: payload.shipping_value,
            discounts: payload.discounts,
            total: payload.total,
            status: payload.status,
            payment_status: payload.payment_status,
            items: payload.items,
            applied_coupon: payload.applied_coupon,
            display_date,
            refreshed: false,
        }
    }

    /// Overwrites the snapshot with the backend's view of the order.
    /// Fields the fetch did not supply keep their snapshot value: an
    /// order summary can come back without line items or coupon, and
    /// those decode as empty/`None`.
    fn apply_order(&mut self, order: Order) {
        self.order_id = Some(order.id);
        self.order_number = Some(order.order_number);
        self.subtotal = Some(order.subtotal);
        self.tax = Some(order.tax);
        self.shipping_value = Some(order.shipping_value);
        self.discounts = Some(order.discounts);
        self.total = Some(order.total);
        self.status = Some(order.status);
        self.payment_status = Some(order.payment_status);
        if !order.items.is_empty() {
            self.items = order.items;
        }
        if order.applied_coupon.is_some() {
            self.applied_coupon = order.applied_coupon;
        }
        self.display_date = order.created_at;
        self.refreshed = true;
    }
}

/// How the confirmation page resolves.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfirmationOutcome {
    /// Render the confirmation with this view.
    Render(Box<ConfirmationView>),
    /// Nothing usable arrived with the navigation; send the customer
    /// back to the storefront.
    RedirectStorefront,
}

/// Resolves the confirmation page from the hand-off query string.
///
/// The hand-off snapshot renders immediately; the backend is asked for
/// the authoritative order in the same pass, and its answer overwrites
/// the snapshot field by field. A backend the page cannot reach is not
/// an error here, the snapshot simply stands.
#[derive(Clone)]
pub struct ConfirmationReconciler {
    workflow: OrderWorkflow,
}

impl ConfirmationReconciler {
    pub fn new(workflow: OrderWorkflow) -> Self {
        Self { workflow }
    }

    #[instrument(skip(self, raw_query))]
    pub async fn resolve(&self, raw_query: Option<&str>) -> ConfirmationOutcome {
        let raw = match raw_query {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => {
                info!("Confirmation reached without a hand-off payload");
                return ConfirmationOutcome::RedirectStorefront;
            }
        };

        let payload = match HandoffPayload::decode(raw) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "Hand-off payload unusable");
                return ConfirmationOutcome::RedirectStorefront;
            }
        };

        if payload.order_id.is_none() && payload.order_number.is_none() {
            warn!("Hand-off payload identifies no order");
            return ConfirmationOutcome::RedirectStorefront;
        }

        let mut view = ConfirmationView::from_payload(payload);

        if let Some(order_id) = view.order_id {
            match self.workflow.fetch_order(order_id).await {
                Ok(order) => view.apply_order(order),
                Err(err) => {
                    warn!(
                        %order_id,
                        error = %err,
                        "Could not refresh the order, rendering the hand-off snapshot"
                    );
                }
            }
        }

        ConfirmationOutcome::Render(Box::new(view))
    }
}
