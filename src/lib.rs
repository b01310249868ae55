//! Checkout payment orchestration core.
//!
//! Drives the payment leg of a storefront checkout: order creation and
//! history against the backend API, payment provider selection, the
//! payment intent lifecycle with confirmation and recovery, and the
//! post-payment confirmation hand-off.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod models;
pub mod provider;
pub mod services;
pub mod store;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::CheckoutConfig;
use crate::errors::CheckoutError;
use crate::events::{CheckoutEvent, EventSender};
use crate::gateway::HttpOrderGateway;
use crate::provider::ProviderRegistry;
use crate::services::{ConfirmationReconciler, OrderWorkflow, PaymentOrchestrator};
use crate::store::OrderStore;

/// Fully wired checkout core: one store, one workflow, one
/// orchestrator, one reconciler, all sharing an event channel.
#[derive(Clone)]
pub struct CheckoutApp {
    pub config: CheckoutConfig,
    pub store: OrderStore,
    pub workflow: OrderWorkflow,
    pub orchestrator: PaymentOrchestrator,
    pub reconciler: ConfirmationReconciler,
    pub event_sender: EventSender,
}

impl CheckoutApp {
    /// Wires the whole pipeline from configuration.
    ///
    /// Returns the app and the receiving end of the event channel;
    /// hand the receiver to [`events::process_events`] or a consumer of
    /// your own.
    pub fn from_config(
        config: CheckoutConfig,
        registry: ProviderRegistry,
    ) -> Result<(Self, mpsc::Receiver<CheckoutEvent>), CheckoutError> {
        let (event_sender, receiver) = events::channel(config.event_channel_capacity);
        let sender = Arc::new(event_sender.clone());

        let gateway = Arc::new(HttpOrderGateway::new(&config.gateway)?);
        let store = OrderStore::new();
        let workflow = OrderWorkflow::new(gateway, store.clone(), Some(sender.clone()))
            .with_page_size(config.default_page_size);
        let orchestrator = PaymentOrchestrator::new(Arc::new(registry), Some(sender));
        let reconciler = ConfirmationReconciler::new(workflow.clone());

        Ok((
            Self {
                config,
                store,
                workflow,
                orchestrator,
                reconciler,
                event_sender,
            },
            receiver,
        ))
    }
}

pub mod prelude {
    pub use crate::config::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::gateway::*;
    pub use crate::models::*;
    pub use crate::provider::*;
    pub use crate::services::*;
    pub use crate::store::*;
    pub use crate::CheckoutApp;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_wires_from_default_config() {
        let config = CheckoutConfig::default();
        let registry = ProviderRegistry::from_provider_settings(&config.providers);

        let (app, _receiver) = CheckoutApp::from_config(config, registry).unwrap();

        assert!(!app.store.is_loading());
        assert_eq!(app.orchestrator.offered_providers().len(), 2);
    }
}
