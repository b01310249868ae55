use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;
use uuid::Uuid;

use checkout_core::errors::CheckoutError;
use checkout_core::events::{self, CheckoutEvent};
use checkout_core::gateway::{CreateOrderRequest, OrderGateway};
use checkout_core::models::order::{
    DeliveryType, Order, OrderItem, OrderPage, OrderStatus, PaymentStatus,
};
use checkout_core::models::payment::{
    amount_to_minor_units, CardCaptureHandle, PaymentIntent, PaymentProvider,
    ProviderConfirmation,
};
use checkout_core::provider::{PaymentProviderAdapter, ProviderRegistry};
use checkout_core::services::{
    CheckoutPhase, ConfirmationReconciler, OrderWorkflow, PaymentOrchestrator,
};
use checkout_core::store::OrderStore;

/// In-memory order backend. Orders created through it are remembered
/// and served back by id, newest first.
pub struct InMemoryBackend {
    orders: Mutex<Vec<Order>>,
    next_number: AtomicU32,
    pub create_calls: AtomicU32,
    fail_reads: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
            next_number: AtomicU32::new(1001),
            create_calls: AtomicU32::new(0),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent read fail with a network error. Creates
    /// still go through.
    #[allow(dead_code)]
    pub fn go_offline(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Flips the stored order to paid, the way the payment webhook
    /// would on the real backend.
    #[allow(dead_code)]
    pub fn mark_paid(&self, order_id: Uuid) {
        let mut orders = self.orders.lock().expect("backend orders lock");
        if let Some(order) = orders.iter_mut().find(|o| o.id == order_id) {
            order.status = OrderStatus::Paid;
            order.payment_status = PaymentStatus::Paid;
            order.updated_at = Some(Utc::now());
        }
    }
}

#[async_trait]
impl OrderGateway for InMemoryBackend {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, CheckoutError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let number = self.next_number.fetch_add(1, Ordering::SeqCst);

        let item = OrderItem::new(
            Uuid::new_v4(),
            "Mechanical Keyboard".to_string(),
            1,
            dec!(89.90),
        );
        let mut order = Order {
            id: Uuid::new_v4(),
            order_number: format!("ORD-{}", number),
            subtotal: item.subtotal,
            tax: dec!(7.19),
            shipping_value: request.shipping_value,
            discounts: Decimal::ZERO,
            total: Decimal::ZERO,
            status: OrderStatus::Created,
            payment_status: PaymentStatus::Pending,
            items: vec![item],
            applied_coupon: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        order.recompute_total();

        self.orders
            .lock()
            .expect("backend orders lock")
            .insert(0, order.clone());
        Ok(order)
    }

    async fn list_orders(
        &self,
        page: u64,
        size: u64,
        _sort: Option<&str>,
    ) -> Result<OrderPage, CheckoutError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CheckoutError::Network("backend unreachable".to_string()));
        }

        let orders = self.orders.lock().expect("backend orders lock");
        let size = size.max(1);
        let content: Vec<Order> = orders
            .iter()
            .skip((page * size) as usize)
            .take(size as usize)
            .cloned()
            .collect();
        let total_elements = orders.len() as u64;

        Ok(OrderPage {
            content,
            number: page,
            size,
            total_pages: total_elements.div_ceil(size),
            total_elements,
        })
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Order, CheckoutError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CheckoutError::Network("backend unreachable".to_string()));
        }

        self.orders
            .lock()
            .expect("backend orders lock")
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
            .ok_or_else(|| CheckoutError::NotFound(format!("Order {} not found", order_id)))
    }
}

/// How the scripted card adapter answers the next confirmation call.
#[derive(Clone, Copy, Debug)]
#[allow(dead_code)]
pub enum ConfirmBehavior {
    Succeed,
    Decline(Option<&'static str>),
    NetworkError,
}

/// Scripted card provider. Counts calls and answers confirmations
/// according to the current behavior.
pub struct TestCardAdapter {
    behavior: Mutex<ConfirmBehavior>,
    pub intent_calls: AtomicU32,
    pub confirm_calls: AtomicU32,
}

impl TestCardAdapter {
    pub fn new() -> Self {
        Self {
            behavior: Mutex::new(ConfirmBehavior::Succeed),
            intent_calls: AtomicU32::new(0),
            confirm_calls: AtomicU32::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn script_confirmation(&self, behavior: ConfirmBehavior) {
        *self.behavior.lock().expect("behavior lock") = behavior;
    }
}

#[async_trait]
impl PaymentProviderAdapter for TestCardAdapter {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Card
    }

    async fn create_intent(&self, order: &Order) -> Result<PaymentIntent, CheckoutError> {
        let seq = self.intent_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentIntent {
            id: format!("pi_test_{}", seq),
            order_id: order.id,
            client_secret: format!("pi_test_{}_secret", seq),
            provider: PaymentProvider::Card,
            amount_minor: Some(amount_to_minor_units(order.total)?),
            currency: "USD".to_string(),
            created_at: Utc::now(),
        })
    }

    async fn confirm(
        &self,
        _client_secret: &str,
        _capture: &CardCaptureHandle,
    ) -> Result<ProviderConfirmation, CheckoutError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        match *self.behavior.lock().expect("behavior lock") {
            ConfirmBehavior::Succeed => Ok(ProviderConfirmation::succeeded()),
            ConfirmBehavior::Decline(reason) => {
                Ok(ProviderConfirmation::failed(reason.map(str::to_string)))
            }
            ConfirmBehavior::NetworkError => {
                Err(CheckoutError::Network("provider unreachable".to_string()))
            }
        }
    }
}

/// Fully wired checkout core over an in-memory backend and a scripted
/// card provider. Wallet is offered without an adapter, matching the
/// production configuration.
pub struct TestCheckout {
    pub backend: Arc<InMemoryBackend>,
    pub card: Arc<TestCardAdapter>,
    pub store: OrderStore,
    pub workflow: OrderWorkflow,
    pub orchestrator: PaymentOrchestrator,
    pub reconciler: ConfirmationReconciler,
    events: Mutex<mpsc::Receiver<CheckoutEvent>>,
}

impl TestCheckout {
    pub fn new() -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        let card = Arc::new(TestCardAdapter::new());

        let (event_sender, receiver) = events::channel(64);
        let sender = Arc::new(event_sender);

        let store = OrderStore::new();
        let workflow = OrderWorkflow::new(backend.clone(), store.clone(), Some(sender.clone()));

        let registry = ProviderRegistry::new(vec![PaymentProvider::Card, PaymentProvider::Wallet])
            .with_adapter(card.clone());
        let orchestrator = PaymentOrchestrator::new(Arc::new(registry), Some(sender));
        let reconciler = ConfirmationReconciler::new(workflow.clone());

        Self {
            backend,
            card,
            store,
            workflow,
            orchestrator,
            reconciler,
            events: Mutex::new(receiver),
        }
    }

    /// Places an order through the workflow with a valid request.
    pub async fn place_order(&self) -> Order {
        self.workflow
            .create_order(&valid_request())
            .await
            .expect("order creation should succeed")
    }

    /// Drives an order through selection, intent and confirmation with
    /// the card provider.
    #[allow(dead_code)]
    pub async fn pay_order(&self, order: &Order) -> CheckoutPhase {
        self.orchestrator
            .start_checkout(order)
            .await
            .expect("start checkout");
        self.orchestrator
            .select_provider(order, PaymentProvider::Card)
            .await
            .expect("select card provider");
        self.orchestrator
            .request_intent(order)
            .await
            .expect("request payment intent");
        self.orchestrator
            .confirm_payment(order, &CardCaptureHandle::new("tok_test_visa"))
            .await
            .expect("confirm payment")
    }

    /// Events published so far, in publication order.
    pub fn drain_events(&self) -> Vec<CheckoutEvent> {
        let mut receiver = self.events.lock().expect("event receiver lock");
        let mut drained = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            drained.push(event);
        }
        drained
    }
}

/// A create request that passes validation.
pub fn valid_request() -> CreateOrderRequest {
    CreateOrderRequest {
        shipping_address_id: Uuid::new_v4(),
        shipping_value: dec!(5.00),
        shipping_date: NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid shipping date"),
        delivery_type: DeliveryType::Home,
        coupon_code: None,
        notes: None,
    }
}
