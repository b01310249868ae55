//! Property-based tests for the checkout money and encoding paths.
//!
//! These tests use proptest to verify invariants across a wide range of
//! inputs, helping to catch edge cases that unit tests might miss.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use checkout_core::gateway::CreateOrderRequest;
use checkout_core::models::coupon::{Coupon, DiscountKind};
use checkout_core::models::handoff::HandoffPayload;
use checkout_core::models::order::{DeliveryType, Order, OrderStatus, PaymentStatus};
use checkout_core::models::payment::amount_to_minor_units;
use checkout_core::services::CouponEngine;

// Strategies for generating test data
fn cents_strategy(max_cents: i64) -> impl Strategy<Value = Decimal> {
    (0..=max_cents).prop_map(|cents| Decimal::new(cents, 2))
}

fn hostile_coupon_strategy() -> impl Strategy<Value = Coupon> {
    // Percentages outside [0,100] and oversized or negative fixed
    // amounts are all fair game on the wire.
    prop_oneof![
        (-5_000i64..=20_000).prop_map(|basis| {
            Coupon::new("PROP-PCT", DiscountKind::Percentage, Decimal::new(basis, 2))
        }),
        (-100_000_00i64..=100_000_00).prop_map(|cents| {
            Coupon::new("PROP-FIX", DiscountKind::Fixed, Decimal::new(cents, 2))
        }),
        (0i64..=100_00).prop_map(|cents| {
            Coupon::new("PROP-UNK", DiscountKind::Unknown, Decimal::new(cents, 2))
        }),
    ]
}

fn order_with_amounts(subtotal: Decimal, tax: Decimal, shipping_value: Decimal) -> Order {
    let mut order = Order {
        id: Uuid::new_v4(),
        order_number: "PROP-1001".to_string(),
        subtotal,
        tax,
        shipping_value,
        discounts: Decimal::ZERO,
        total: Decimal::ZERO,
        status: OrderStatus::Created,
        payment_status: PaymentStatus::Pending,
        items: Vec::new(),
        applied_coupon: None,
        created_at: Utc::now(),
        updated_at: None,
    };
    order.recompute_total();
    order
}

// Property: a discount never goes negative and never exceeds the subtotal
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn discount_stays_within_the_subtotal(
        subtotal in cents_strategy(1_000_000_00),
        coupon in hostile_coupon_strategy(),
    ) {
        let discount = CouponEngine::new().compute_discount(subtotal, Some(&coupon));
        prop_assert!(discount >= Decimal::ZERO, "negative discount: {}", discount);
        prop_assert!(
            discount <= subtotal,
            "discount {} exceeds subtotal {}",
            discount,
            subtotal
        );
    }

    #[test]
    fn applying_any_coupon_keeps_totals_consistent(
        subtotal in cents_strategy(1_000_000_00),
        tax in cents_strategy(100_000_00),
        shipping in cents_strategy(1_000_00),
        coupon in hostile_coupon_strategy(),
    ) {
        let mut order = order_with_amounts(subtotal, tax, shipping);
        CouponEngine::new().apply(&mut order, Some(coupon));

        prop_assert!(order.total >= Decimal::ZERO, "negative total: {}", order.total);
        prop_assert!(order.totals_consistent(), "inconsistent totals: {:?}", order);
    }
}

// Property: minor-unit conversion is exact for two-decimal amounts
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn two_decimal_amounts_convert_to_exact_cents(cents in 0i64..=10_000_000_00) {
        let amount = Decimal::new(cents, 2);
        let minor = amount_to_minor_units(amount);
        prop_assert_eq!(minor.ok(), Some(cents));
    }

    #[test]
    fn negative_amounts_never_convert(cents in -10_000_000_00i64..=-1) {
        let amount = Decimal::new(cents, 2);
        prop_assert!(amount_to_minor_units(amount).is_err());
    }
}

// Property: the hand-off snapshot survives URL encoding for any order number
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn handoff_payload_survives_awkward_order_numbers(
        order_number in "[A-Za-z0-9 &+=/?#%_-]{1,24}",
        total in cents_strategy(1_000_000_00),
    ) {
        let mut order = order_with_amounts(total, Decimal::ZERO, Decimal::ZERO);
        order.order_number = order_number.clone();

        let encoded = HandoffPayload::from_order(&order).encode();
        prop_assert!(encoded.is_ok(), "encode failed: {:?}", encoded);

        let decoded = HandoffPayload::decode(&encoded.unwrap());
        prop_assert!(decoded.is_ok(), "decode failed: {:?}", decoded);
        let decoded = decoded.unwrap();
        prop_assert_eq!(decoded.order_number, Some(order_number));
        prop_assert_eq!(decoded.total, Some(order.total));
    }
}

// Property: coupon code validation accepts the documented format and nothing else
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn well_formed_coupon_codes_pass_validation(code in "[A-Z0-9][A-Z0-9_-]{0,31}") {
        let request = request_with_coupon(Some(code.clone()));
        prop_assert!(request.validate().is_ok(), "valid code rejected: {}", code);
    }

    #[test]
    fn lowercase_coupon_codes_fail_validation(code in "[a-z]{1,12}") {
        let request = request_with_coupon(Some(code.clone()));
        prop_assert!(request.validate().is_err(), "lowercase code accepted: {}", code);
    }
}

fn request_with_coupon(coupon_code: Option<String>) -> CreateOrderRequest {
    CreateOrderRequest {
        shipping_address_id: Uuid::new_v4(),
        shipping_value: Decimal::new(500, 2),
        shipping_date: chrono::NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid shipping date"),
        delivery_type: DeliveryType::Home,
        coupon_code,
        notes: None,
    }
}
