use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{CheckoutError, ErrorKind, GENERIC_FAILURE_MESSAGE};
use crate::events::{CheckoutEvent, EventSender};
use crate::models::handoff::HandoffPayload;
use crate::models::order::Order;
use crate::models::payment::{
    amount_to_minor_units, CardCaptureHandle, ConfirmationStatus, PaymentIntent, PaymentProvider,
};
use crate::provider::ProviderRegistry;

const NOT_INITIALIZED_MESSAGE: &str = "Payment was not initialized";
const DECLINED_FALLBACK_MESSAGE: &str = "Payment declined";

/// Where a checkout attempt stands for one order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutPhase {
    /// No checkout attempt exists for the order.
    Idle,
    /// The customer is choosing a payment provider.
    ProviderSelection,
    /// An intent request is on the wire.
    IntentPending,
    /// The intent exists and the customer can confirm.
    IntentReady,
    /// A confirmation request is on the wire.
    Confirming,
    /// Payment went through. Terminal for the order.
    Succeeded,
    /// The attempt failed. Recoverable failures restart at provider
    /// selection; non-recoverable ones end the attempt for good.
    Failed { message: String, recoverable: bool },
}

impl CheckoutPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CheckoutPhase::Succeeded
                | CheckoutPhase::Failed {
                    recoverable: false,
                    ..
                }
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CheckoutPhase::Failed { .. })
    }
}

/// Coordinates the payment leg of checkout per order: provider
/// selection, intent creation, confirmation, and recovery.
///
/// At most one payment request runs per order at a time. Duplicate
/// submissions while one is on the wire return the current phase
/// without reaching any payment backend.
#[derive(Clone)]
pub struct PaymentOrchestrator {
    registry: Arc<ProviderRegistry>,
    phases: Arc<DashMap<Uuid, CheckoutPhase>>,
    selections: Arc<DashMap<Uuid, PaymentProvider>>,
    intents: Arc<DashMap<Uuid, PaymentIntent>>,
    in_flight: Arc<DashMap<Uuid, ()>>,
    event_sender: Option<Arc<EventSender>>,
}

impl PaymentOrchestrator {
    pub fn new(registry: Arc<ProviderRegistry>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            registry,
            phases: Arc::new(DashMap::new()),
            selections: Arc::new(DashMap::new()),
            intents: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashMap::new()),
            event_sender,
        }
    }

    /// Providers to present for selection.
    pub fn offered_providers(&self) -> &[PaymentProvider] {
        self.registry.offered_providers()
    }

    /// Current phase for the order, [`CheckoutPhase::Idle`] when no
    /// attempt exists.
    pub fn phase(&self, order_id: Uuid) -> CheckoutPhase {
        self.phases
            .get(&order_id)
            .map(|p| p.clone())
            .unwrap_or(CheckoutPhase::Idle)
    }

    /// Provider currently associated with the order's attempt.
    pub fn selected_provider(&self, order_id: Uuid) -> Option<PaymentProvider> {
        self.selections.get(&order_id).map(|p| *p)
    }

    /// Intent currently associated with the order's attempt.
    pub fn intent(&self, order_id: Uuid) -> Option<PaymentIntent> {
        self.intents.get(&order_id).map(|i| i.clone())
    }

    /// Opens a checkout attempt for the order and moves it to provider
    /// selection. Any leftovers from an earlier attempt are dropped.
    /// Restarting while a payment request is on the wire is rejected,
    /// so an in-flight request can never land on a fresh attempt.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn start_checkout(&self, order: &Order) -> Result<CheckoutPhase, CheckoutError> {
        let _guard = match InFlightGuard::try_claim(&self.in_flight, order.id) {
            Some(guard) => guard,
            None => {
                return Err(CheckoutError::Validation(
                    "A payment request is in progress".to_string(),
                ))
            }
        };

        if order.is_paid() || self.phase(order.id) == CheckoutPhase::Succeeded {
            return Err(CheckoutError::Validation(
                "Order is already paid".to_string(),
            ));
        }

        self.selections.remove(&order.id);
        self.intents.remove(&order.id);
        self.phases
            .insert(order.id, CheckoutPhase::ProviderSelection);

        info!("Checkout attempt opened");
        self.publish(CheckoutEvent::CheckoutStarted { order_id: order.id })
            .await;
        Ok(CheckoutPhase::ProviderSelection)
    }

    /// Records the customer's provider choice.
    ///
    /// A provider this client cannot drive fails the attempt right here,
    /// recoverably and without any network traffic; no intent is ever
    /// requested for it.
    #[instrument(skip(self, order), fields(order_id = %order.id, provider = %provider))]
    pub async fn select_provider(
        &self,
        order: &Order,
        provider: PaymentProvider,
    ) -> Result<CheckoutPhase, CheckoutError> {
        match self.phase(order.id) {
            CheckoutPhase::Idle => {
                return Err(CheckoutError::Validation(
                    "Checkout has not been started for this order".to_string(),
                ))
            }
            CheckoutPhase::Succeeded => {
                return Err(CheckoutError::Validation(
                    "Order is already paid".to_string(),
                ))
            }
            CheckoutPhase::IntentPending | CheckoutPhase::Confirming => {
                return Err(CheckoutError::Validation(
                    "A payment request is in progress".to_string(),
                ))
            }
            CheckoutPhase::Failed {
                recoverable: false, ..
            } => {
                return Err(CheckoutError::Validation(
                    "Checkout cannot continue for this order".to_string(),
                ))
            }
            CheckoutPhase::ProviderSelection
            | CheckoutPhase::IntentReady
            | CheckoutPhase::Failed {
                recoverable: true, ..
            } => {}
        }

        // Re-selection discards whatever the previous attempt produced.
        self.intents.remove(&order.id);

        if !self.registry.is_offered(provider)
            || !provider.is_implemented()
            || self.registry.adapter_for(provider).is_none()
        {
            warn!("Selected provider cannot be driven by this client");
            return Ok(self.fail_unsupported(order.id, provider).await);
        }

        self.selections.insert(order.id, provider);
        self.phases
            .insert(order.id, CheckoutPhase::ProviderSelection);
        info!("Payment provider selected");
        self.publish(CheckoutEvent::ProviderSelected {
            order_id: order.id,
            provider,
        })
        .await;
        Ok(CheckoutPhase::ProviderSelection)
    }

    /// Creates a payment intent for the order with the selected
    /// provider's backend.
    ///
    /// Repeat calls reuse the existing intent, and a call while another
    /// request is on the wire returns the current phase untouched.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn request_intent(&self, order: &Order) -> Result<CheckoutPhase, CheckoutError> {
        let _guard = match InFlightGuard::try_claim(&self.in_flight, order.id) {
            Some(guard) => guard,
            None => {
                info!("Payment request already in flight, ignoring duplicate");
                return Ok(self.phase(order.id));
            }
        };

        match self.phase(order.id) {
            CheckoutPhase::IntentReady if self.intents.contains_key(&order.id) => {
                return Ok(CheckoutPhase::IntentReady);
            }
            CheckoutPhase::ProviderSelection => {}
            CheckoutPhase::Idle => {
                return Err(CheckoutError::Validation(
                    "Checkout has not been started for this order".to_string(),
                ))
            }
            CheckoutPhase::Succeeded => {
                return Err(CheckoutError::Validation(
                    "Order is already paid".to_string(),
                ))
            }
            other => {
                return Err(CheckoutError::Validation(format!(
                    "Cannot request a payment intent from the {:?} phase",
                    other
                )))
            }
        }

        let provider = match self.selected_provider(order.id) {
            Some(provider) => provider,
            None => {
                return Err(CheckoutError::Validation(
                    "No payment provider selected".to_string(),
                ))
            }
        };

        let adapter = match self.registry.adapter_for(provider) {
            Some(adapter) => adapter,
            None => return Ok(self.fail_unsupported(order.id, provider).await),
        };

        self.phases.insert(order.id, CheckoutPhase::IntentPending);

        match adapter.create_intent(order).await {
            Ok(intent) => {
                // The intent is authoritative about its provider. A
                // mismatch means the backend routed the payment
                // elsewhere, and the client follows.
                let effective = intent.provider;
                if effective != provider {
                    warn!(
                        selected = %provider,
                        effective = %effective,
                        "Intent provider differs from selection, following the intent"
                    );
                    self.selections.insert(order.id, effective);
                }

                if !effective.is_implemented() {
                    return Ok(self.fail_unsupported(order.id, effective).await);
                }

                let intent_id = intent.id.clone();
                self.intents.insert(order.id, intent);
                self.phases.insert(order.id, CheckoutPhase::IntentReady);
                info!(%intent_id, "Payment intent ready");
                self.publish(CheckoutEvent::PaymentIntentReady {
                    order_id: order.id,
                    intent_id,
                })
                .await;
                Ok(CheckoutPhase::IntentReady)
            }
            Err(err) => {
                warn!(error = %err, "Payment intent request failed");
                Ok(self
                    .fail_attempt(order.id, err.display_message(), true)
                    .await)
            }
        }
    }

    /// Amount to show on the pay button, in minor units. The intent's
    /// amount wins when the provider reported one; otherwise the order
    /// total converts locally.
    pub fn display_amount_minor(&self, order: &Order) -> Result<i64, CheckoutError> {
        if let Some(intent) = self.intents.get(&order.id) {
            if let Some(amount) = intent.amount_minor {
                return Ok(amount);
            }
        }
        amount_to_minor_units(order.total)
    }

    /// Confirms the payment with the captured payment method.
    ///
    /// A transient network failure leaves the intent ready so the same
    /// attempt can be confirmed again; a decline fails the attempt
    /// recoverably with the provider's own message.
    #[instrument(skip(self, order, capture), fields(order_id = %order.id))]
    pub async fn confirm_payment(
        &self,
        order: &Order,
        capture: &CardCaptureHandle,
    ) -> Result<CheckoutPhase, CheckoutError> {
        let _guard = match InFlightGuard::try_claim(&self.in_flight, order.id) {
            Some(guard) => guard,
            None => {
                info!("Payment request already in flight, ignoring duplicate");
                return Ok(self.phase(order.id));
            }
        };

        match self.phase(order.id) {
            CheckoutPhase::IntentReady => {}
            CheckoutPhase::Succeeded => return Ok(CheckoutPhase::Succeeded),
            CheckoutPhase::Idle => {
                return Err(CheckoutError::Validation(
                    "Checkout has not been started for this order".to_string(),
                ))
            }
            _ => {
                // Confirming without a usable intent is a broken
                // attempt; the customer starts over from a new order.
                return Ok(self
                    .fail_attempt(order.id, NOT_INITIALIZED_MESSAGE.to_string(), false)
                    .await);
            }
        }

        let intent = match self.intent(order.id) {
            Some(intent) => intent,
            None => {
                return Ok(self
                    .fail_attempt(order.id, NOT_INITIALIZED_MESSAGE.to_string(), false)
                    .await)
            }
        };

        // The intent decides which adapter confirms, regardless of what
        // was selected earlier.
        let adapter = match self.registry.adapter_for(intent.provider) {
            Some(adapter) => adapter,
            None => return Ok(self.fail_unsupported(order.id, intent.provider).await),
        };

        self.phases.insert(order.id, CheckoutPhase::Confirming);

        match adapter.confirm(&intent.client_secret, capture).await {
            Ok(confirmation) if confirmation.status == ConfirmationStatus::Succeeded => {
                self.phases.insert(order.id, CheckoutPhase::Succeeded);
                info!(intent_id = %intent.id, "Payment confirmed");
                self.publish(CheckoutEvent::PaymentSucceeded {
                    order_id: order.id,
                    intent_id: intent.id,
                })
                .await;
                Ok(CheckoutPhase::Succeeded)
            }
            Ok(confirmation) => {
                let message = confirmation
                    .provider_error
                    .unwrap_or_else(|| DECLINED_FALLBACK_MESSAGE.to_string());
                warn!(%message, "Payment declined by provider");
                Ok(self.fail_attempt(order.id, message, true).await)
            }
            Err(err) if err.kind() == ErrorKind::Network => {
                // The confirmation may not have reached the provider.
                // Keep the intent so the customer can try again.
                warn!(error = %err, "Confirmation did not complete, intent stays ready");
                self.phases.insert(order.id, CheckoutPhase::IntentReady);
                Err(err)
            }
            Err(CheckoutError::ProviderDeclined(message)) => {
                warn!(%message, "Payment declined by provider");
                Ok(self.fail_attempt(order.id, message, true).await)
            }
            Err(err) => {
                warn!(error = %err, "Confirmation failed");
                Ok(self
                    .fail_attempt(order.id, GENERIC_FAILURE_MESSAGE.to_string(), true)
                    .await)
            }
        }
    }

    /// Serialized order snapshot for the confirmation hand-off, only
    /// available once payment succeeded.
    pub fn handoff_payload(&self, order: &Order) -> Result<String, CheckoutError> {
        if self.phase(order.id) != CheckoutPhase::Succeeded {
            return Err(CheckoutError::Validation(
                "Checkout has not succeeded for this order".to_string(),
            ));
        }
        HandoffPayload::from_order(order).encode()
    }

    /// Returns a recoverably failed attempt to provider selection.
    /// Anything else is left alone.
    pub fn reset_attempt(&self, order_id: Uuid) -> CheckoutPhase {
        match self.phase(order_id) {
            CheckoutPhase::Failed {
                recoverable: true, ..
            } => {
                self.selections.remove(&order_id);
                self.intents.remove(&order_id);
                self.phases
                    .insert(order_id, CheckoutPhase::ProviderSelection);
                CheckoutPhase::ProviderSelection
            }
            other => other,
        }
    }

    /// Fails the attempt recoverably because the named provider cannot
    /// be driven by this client.
    async fn fail_unsupported(&self, order_id: Uuid, provider: PaymentProvider) -> CheckoutPhase {
        let err = CheckoutError::UnsupportedProvider(provider.to_string());
        self.fail_attempt(order_id, err.display_message(), true)
            .await
    }

    async fn fail_attempt(
        &self,
        order_id: Uuid,
        message: String,
        recoverable: bool,
    ) -> CheckoutPhase {
        let phase = CheckoutPhase::Failed {
            message: message.clone(),
            recoverable,
        };
        self.phases.insert(order_id, phase.clone());
        self.publish(CheckoutEvent::PaymentFailed {
            order_id,
            message,
            recoverable,
        })
        .await;
        phase
    }

    async fn publish(&self, event: CheckoutEvent) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!("Failed to publish checkout event: {}", e);
            }
        }
    }
}

/// Occupancy claim on an order's payment slot. Dropping it releases
/// the slot.
struct InFlightGuard<'a> {
    map: &'a DashMap<Uuid, ()>,
    order_id: Uuid,
}

impl<'a> InFlightGuard<'a> {
    fn try_claim(map: &'a DashMap<Uuid, ()>, order_id: Uuid) -> Option<Self> {
        match map.entry(order_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(Self { map, order_id })
            }
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.order_id);
    }
}
