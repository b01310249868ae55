// Checkout pipeline
pub mod coupons;
pub mod orchestrator;
pub mod orders;

// Post-payment confirmation
pub mod reconciler;

pub use coupons::CouponEngine;
pub use orchestrator::{CheckoutPhase, PaymentOrchestrator};
pub use orders::OrderWorkflow;
pub use reconciler::{ConfirmationOutcome, ConfirmationReconciler, ConfirmationView};
