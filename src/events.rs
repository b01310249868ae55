use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::payment::PaymentProvider;

/// Checkout lifecycle events. Published best-effort alongside state
/// transitions; observers never gate the checkout itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CheckoutEvent {
    OrderCreated {
        order_id: Uuid,
        order_number: String,
    },
    CheckoutStarted {
        order_id: Uuid,
    },
    ProviderSelected {
        order_id: Uuid,
        provider: PaymentProvider,
    },
    PaymentIntentReady {
        order_id: Uuid,
        intent_id: String,
    },
    PaymentSucceeded {
        order_id: Uuid,
        intent_id: String,
    },
    PaymentFailed {
        order_id: Uuid,
        message: String,
        recoverable: bool,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<CheckoutEvent>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<CheckoutEvent>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: CheckoutEvent) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Builds a bounded event channel pair.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<CheckoutEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the channel and logs each transition. Runs until every
/// sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<CheckoutEvent>) {
    info!("Starting checkout event loop");

    while let Some(event) = rx.recv().await {
        match event {
            CheckoutEvent::OrderCreated {
                order_id,
                order_number,
            } => {
                info!(%order_id, %order_number, "Order created");
            }
            CheckoutEvent::CheckoutStarted { order_id } => {
                info!(%order_id, "Checkout started");
            }
            CheckoutEvent::ProviderSelected { order_id, provider } => {
                info!(%order_id, %provider, "Payment provider selected");
            }
            CheckoutEvent::PaymentIntentReady {
                order_id,
                intent_id,
            } => {
                info!(%order_id, %intent_id, "Payment intent ready");
            }
            CheckoutEvent::PaymentSucceeded {
                order_id,
                intent_id,
            } => {
                info!(%order_id, %intent_id, "Payment succeeded");
            }
            CheckoutEvent::PaymentFailed {
                order_id,
                message,
                recoverable,
            } => {
                warn!(%order_id, recoverable, %message, "Payment failed");
            }
        }
    }

    info!("Checkout event loop stopped");
}
