// Core models
pub mod coupon;
pub mod handoff;
pub mod order;
pub mod payment;

pub use coupon::{Coupon, DiscountKind};
pub use handoff::HandoffPayload;
pub use order::{DeliveryType, Order, OrderItem, OrderPage, OrderStatus, PaymentStatus};
pub use payment::{
    amount_to_minor_units, CardCaptureHandle, ConfirmationStatus, PaymentIntent, PaymentProvider,
    ProviderConfirmation,
};
