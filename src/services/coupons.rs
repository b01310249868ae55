use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::models::coupon::{Coupon, DiscountKind};
use crate::models::order::Order;

/// Applies coupon discounts to order totals.
///
/// All arithmetic is decimal. Discounts clamp to the subtotal, so a
/// coupon can never push a total below zero, and a coupon the engine
/// does not recognize contributes nothing instead of failing the
/// checkout.
#[derive(Debug, Clone, Copy, Default)]
pub struct CouponEngine;

impl CouponEngine {
    pub fn new() -> Self {
        Self
    }

    /// Discount amount for the coupon against the subtotal.
    pub fn compute_discount(&self, subtotal: Decimal, coupon: Option<&Coupon>) -> Decimal {
        let coupon = match coupon {
            Some(coupon) => coupon,
            None => return Decimal::ZERO,
        };

        let discount = match coupon.kind {
            DiscountKind::Percentage => subtotal * coupon.value / dec!(100),
            DiscountKind::Fixed => coupon.value,
            DiscountKind::Unknown => {
                debug!(code = %coupon.code, "Unrecognized coupon kind, no discount applied");
                Decimal::ZERO
            }
        };

        discount.clamp(Decimal::ZERO, subtotal.max(Decimal::ZERO))
    }

    /// Writes the coupon outcome onto the order: sets the discount,
    /// remembers the applied coupon, and recomputes the total.
    pub fn apply(&self, order: &mut Order, coupon: Option<Coupon>) {
        order.discounts = self.compute_discount(order.subtotal, coupon.as_ref());
        order.applied_coupon = coupon;
        order.recompute_total();
    }
}
