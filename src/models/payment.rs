use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CheckoutError;

/// Payment providers this client recognizes.
///
/// The client's selection is a request; the provider the backend writes
/// into the intent is authoritative. Wire values the client does not
/// recognize decode as `Unknown`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentProvider {
    Card,
    Wallet,
    #[serde(other)]
    Unknown,
}

impl PaymentProvider {
    /// Whether this client can drive a confirmation for the provider.
    /// Wallet is recognized but not yet implemented.
    pub fn is_implemented(&self) -> bool {
        matches!(self, PaymentProvider::Card)
    }

    /// Parses the provider key used in configuration files.
    pub fn from_config_key(key: &str) -> Self {
        match key.to_ascii_uppercase().as_str() {
            "CARD" => PaymentProvider::Card,
            "WALLET" => PaymentProvider::Wallet,
            _ => PaymentProvider::Unknown,
        }
    }
}

/// Backend-issued handle authorizing a single payment attempt.
///
/// Created per order and single-use: consumed by exactly one
/// confirmation attempt, or retried against the same intent after a
/// transient failure. Never reused across distinct orders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    /// Provider-side identifier for the intent.
    pub id: String,

    /// Order this intent authorizes payment for.
    pub order_id: Uuid,

    /// Opaque secret consumed by the confirmation step. Never logged.
    pub client_secret: String,

    /// Provider the backend authorized. Wins over any client selection.
    pub provider: PaymentProvider,

    /// Amount in integer minor units. Authoritative when present.
    #[serde(default, rename = "amount", skip_serializing_if = "Option::is_none")]
    pub amount_minor: Option<i64>,

    /// ISO 4217 currency code.
    pub currency: String,

    /// When the backend issued the intent.
    pub created_at: DateTime<Utc>,
}

/// Terminal statuses a provider confirmation can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConfirmationStatus {
    Succeeded,
    Failed,
}

/// Outcome of a provider confirmation call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfirmation {
    pub status: ConfirmationStatus,

    /// Provider-supplied failure description, surfaced verbatim on decline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_error: Option<String>,
}

impl ProviderConfirmation {
    pub fn succeeded() -> Self {
        Self {
            status: ConfirmationStatus::Succeeded,
            provider_error: None,
        }
    }

    pub fn failed(provider_error: Option<String>) -> Self {
        Self {
            status: ConfirmationStatus::Failed,
            provider_error,
        }
    }
}

/// Opaque handle to the mounted card-capture widget.
///
/// Threaded through to the provider adapter untouched; the orchestrator
/// never introspects it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardCaptureHandle(String);

impl CardCaptureHandle {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Converts a decimal major-unit amount into integer minor units.
///
/// Rejects negative amounts and values outside the representable range
/// rather than silently truncating.
pub fn amount_to_minor_units(amount: Decimal) -> Result<i64, CheckoutError> {
    if amount.is_sign_negative() {
        return Err(CheckoutError::Validation(
            "Amount must not be negative".into(),
        ));
    }

    (amount * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| {
            CheckoutError::Validation(format!("Amount {} exceeds the representable range", amount))
        })
}
