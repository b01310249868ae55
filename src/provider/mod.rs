use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::config::ProviderSettings;
use crate::errors::CheckoutError;
use crate::models::order::Order;
use crate::models::payment::{
    CardCaptureHandle, PaymentIntent, PaymentProvider, ProviderConfirmation,
};

/// Contract every payment provider integration satisfies.
#[async_trait]
pub trait PaymentProviderAdapter: Send + Sync {
    /// Provider this adapter drives.
    fn provider(&self) -> PaymentProvider;

    /// Creates a payment intent for the order with the provider backend.
    async fn create_intent(&self, order: &Order) -> Result<PaymentIntent, CheckoutError>;

    /// Confirms the intent using the captured payment method.
    async fn confirm(
        &self,
        client_secret: &str,
        capture: &CardCaptureHandle,
    ) -> Result<ProviderConfirmation, CheckoutError>;
}

/// Providers offered at checkout and the adapters that can drive them.
///
/// Offering is configuration-driven and independent of adapter
/// availability: a provider may be presented to the customer while no
/// adapter exists for it, and selecting it then fails as unsupported
/// instead of reaching any payment backend.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    offered: Vec<PaymentProvider>,
    adapters: HashMap<PaymentProvider, Arc<dyn PaymentProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new(offered: Vec<PaymentProvider>) -> Self {
        Self {
            offered,
            adapters: HashMap::new(),
        }
    }

    /// Builds the offered list from configuration. Card sorts first so
    /// the default presentation order is stable across runs.
    pub fn from_provider_settings(settings: &HashMap<String, ProviderSettings>) -> Self {
        let mut offered: Vec<PaymentProvider> = Vec::new();
        for (key, provider_settings) in settings {
            if !provider_settings.enabled {
                continue;
            }
            match PaymentProvider::from_config_key(key) {
                PaymentProvider::Unknown => {
                    warn!(provider = %key, "Ignoring unrecognized payment provider in configuration");
                }
                provider => offered.push(provider),
            }
        }
        offered.sort_by_key(|p| match p {
            PaymentProvider::Card => 0,
            PaymentProvider::Wallet => 1,
            PaymentProvider::Unknown => 2,
        });
        offered.dedup();
        Self::new(offered)
    }

    /// Registers an adapter. Registration never changes the offered
    /// list; configuration alone decides what the customer sees.
    pub fn register(&mut self, adapter: Arc<dyn PaymentProviderAdapter>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn PaymentProviderAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Providers to present to the customer.
    pub fn offered_providers(&self) -> &[PaymentProvider] {
        &self.offered
    }

    pub fn is_offered(&self, provider: PaymentProvider) -> bool {
        self.offered.contains(&provider)
    }

    /// Adapter for the provider, when one is registered.
    pub fn adapter_for(
        &self,
        provider: PaymentProvider,
    ) -> Option<Arc<dyn PaymentProviderAdapter>> {
        self.adapters.get(&provider).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    struct StubAdapter(PaymentProvider);

    #[async_trait]
    impl PaymentProviderAdapter for StubAdapter {
        fn provider(&self) -> PaymentProvider {
            self.0
        }

        async fn create_intent(&self, order: &Order) -> Result<PaymentIntent, CheckoutError> {
            Ok(PaymentIntent {
                id: "pi_stub".to_string(),
                order_id: order.id,
                client_secret: "cs_stub".to_string(),
                provider: self.0,
                amount_minor: None,
                currency: "USD".to_string(),
                created_at: Utc::now(),
            })
        }

        async fn confirm(
            &self,
            _client_secret: &str,
            _capture: &CardCaptureHandle,
        ) -> Result<ProviderConfirmation, CheckoutError> {
            Ok(ProviderConfirmation::succeeded())
        }
    }

    fn settings(entries: &[(&str, bool)]) -> HashMap<String, ProviderSettings> {
        entries
            .iter()
            .map(|(key, enabled)| {
                (
                    key.to_string(),
                    ProviderSettings {
                        enabled: *enabled,
                        publishable_key: None,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn offered_list_is_config_driven_and_card_first() {
        let registry =
            ProviderRegistry::from_provider_settings(&settings(&[("wallet", true), ("card", true)]));
        assert_eq!(
            registry.offered_providers(),
            &[PaymentProvider::Card, PaymentProvider::Wallet]
        );
    }

    #[test]
    fn disabled_providers_are_not_offered() {
        let registry =
            ProviderRegistry::from_provider_settings(&settings(&[("card", true), ("wallet", false)]));
        assert_eq!(registry.offered_providers(), &[PaymentProvider::Card]);
        assert!(!registry.is_offered(PaymentProvider::Wallet));
    }

    #[test]
    fn unrecognized_provider_keys_are_skipped() {
        let registry =
            ProviderRegistry::from_provider_settings(&settings(&[("card", true), ("paypal", true)]));
        assert_eq!(registry.offered_providers(), &[PaymentProvider::Card]);
    }

    #[test]
    fn offered_without_adapter_resolves_to_none() {
        let registry = ProviderRegistry::new(vec![PaymentProvider::Card, PaymentProvider::Wallet])
            .with_adapter(Arc::new(StubAdapter(PaymentProvider::Card)));

        assert!(registry.adapter_for(PaymentProvider::Card).is_some());
        assert!(registry.is_offered(PaymentProvider::Wallet));
        assert!(registry.adapter_for(PaymentProvider::Wallet).is_none());
    }

    #[test]
    fn registration_does_not_change_the_offered_list() {
        let registry = ProviderRegistry::new(vec![PaymentProvider::Card])
            .with_adapter(Arc::new(StubAdapter(PaymentProvider::Wallet)));

        assert!(!registry.is_offered(PaymentProvider::Wallet));
        assert!(registry.adapter_for(PaymentProvider::Wallet).is_some());
    }
}
