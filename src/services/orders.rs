use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::CheckoutError;
use crate::events::{CheckoutEvent, EventSender};
use crate::gateway::{CreateOrderRequest, OrderGateway};
use crate::models::order::{Order, OrderPage};
use crate::store::OrderStore;

/// Orders sort newest first in the history view.
const DEFAULT_SORT: &str = "createdAt,desc";

/// Drives order reads and creation against the backend, mirroring every
/// request into the shared store as a begin/complete/fail triad.
///
/// Store bookkeeping holds even when a request future is dropped
/// mid-flight: an armed guard clears the loading flag on cancellation,
/// so the store never reports a request that no longer exists.
#[derive(Clone)]
pub struct OrderWorkflow {
    gateway: Arc<dyn OrderGateway>,
    store: OrderStore,
    event_sender: Option<Arc<EventSender>>,
    page_size: u64,
}

impl OrderWorkflow {
    pub fn new(
        gateway: Arc<dyn OrderGateway>,
        store: OrderStore,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            gateway,
            store,
            event_sender,
            page_size: 10,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    /// Fetches one page of the order history, newest first.
    #[instrument(skip(self))]
    pub async fn fetch_orders(&self, page: u64) -> Result<OrderPage, CheckoutError> {
        self.store.begin_fetch_orders();
        let guard = LoadingGuard::new(&self.store);

        match self
            .gateway
            .list_orders(page, self.page_size, Some(DEFAULT_SORT))
            .await
        {
            Ok(order_page) => {
                guard.disarm();
                info!(
                    page,
                    total_elements = order_page.total_elements,
                    "Fetched order page"
                );
                self.store.complete_fetch_orders(order_page.clone());
                Ok(order_page)
            }
            Err(err) => {
                guard.disarm();
                warn!(page, error = %err, "Order page fetch failed");
                self.store.fail_fetch_orders(err.display_message());
                Err(err)
            }
        }
    }

    /// Fetches a single order and makes it the store's current order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn fetch_order(&self, order_id: Uuid) -> Result<Order, CheckoutError> {
        self.store.begin_get_order();
        let guard = LoadingGuard::new(&self.store);

        match self.gateway.get_order(order_id).await {
            Ok(order) => {
                guard.disarm();
                info!(order_number = %order.order_number, "Fetched order");
                self.store.complete_get_order(order.clone());
                Ok(order)
            }
            Err(err) => {
                guard.disarm();
                warn!(error = %err, "Order fetch failed");
                self.store.fail_get_order(err.display_message());
                Err(err)
            }
        }
    }

    /// Creates an order from the checkout draft.
    ///
    /// The request is sent at most once. On an ambiguous outcome such
    /// as a timeout the order may or may not exist on the backend, so
    /// resubmission stays a deliberate caller decision.
    #[instrument(skip(self, request))]
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, CheckoutError> {
        self.store.begin_create_order();
        let guard = LoadingGuard::new(&self.store);

        match self.gateway.create_order(request).await {
            Ok(order) => {
                guard.disarm();
                info!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    "Order created"
                );
                self.store.complete_create_order(order.clone());
                self.publish(CheckoutEvent::OrderCreated {
                    order_id: order.id,
                    order_number: order.order_number.clone(),
                })
                .await;
                Ok(order)
            }
            Err(err) => {
                guard.disarm();
                warn!(error = %err, "Order creation failed");
                self.store.fail_create_order(err.display_message());
                Err(err)
            }
        }
    }

    /// Publishes an event without letting observer trouble reach the
    /// checkout path.
    async fn publish(&self, event: CheckoutEvent) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!("Failed to publish checkout event: {}", e);
            }
        }
    }
}

/// Clears the store's loading flag if the surrounding request future is
/// dropped before reaching a terminal triad call.
struct LoadingGuard<'a> {
    store: &'a OrderStore,
    armed: bool,
}

impl<'a> LoadingGuard<'a> {
    fn new(store: &'a OrderStore) -> Self {
        Self { store, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.store.abort_request();
        }
    }
}
