use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use uuid::Uuid;

use crate::models::order::{Order, OrderPage, OrderStatus, PaymentStatus};

/// Pagination metadata mirrored from the backend page envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub size: u64,
    pub total_pages: u64,
    pub total_elements: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 0,
            size: 10,
            total_pages: 0,
            total_elements: 0,
        }
    }
}

/// Client-side listing filters.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OrderFilters {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub search: Option<String>,
}

impl OrderFilters {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.payment_status.is_none() && self.search.is_none()
    }
}

/// Snapshot of the store state. `orders` is newest-first.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OrderStoreState {
    pub orders: Vec<Order>,
    pub current_order: Option<Order>,
    pub loading: bool,
    pub error: Option<String>,
    pub pagination: Pagination,
    pub filters: OrderFilters,
}

/// Single source of truth for order state on the client.
///
/// Consumers read snapshots; every mutation goes through one of the
/// named transitions below. Each logical request runs exactly one
/// begin/complete/fail triad, and no code path leaves `loading` stuck
/// at true. Transitions are idempotent under re-invocation with the
/// same inputs.
#[derive(Clone, Default)]
pub struct OrderStore {
    inner: Arc<RwLock<OrderStoreState>>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, OrderStoreState> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, OrderStoreState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    // ---- fetch-orders triad ----

    pub fn begin_fetch_orders(&self) {
        let mut state = self.write();
        state.loading = true;
        state.error = None;
    }

    /// Replaces the list with the page content and adopts the page
    /// metadata. Absent metadata already defaulted at decode time.
    pub fn complete_fetch_orders(&self, page: OrderPage) {
        let mut state = self.write();
        state.orders = page.content;
        state.pagination = Pagination {
            page: page.number,
            size: page.size,
            total_pages: page.total_pages,
            total_elements: page.total_elements,
        };
        state.loading = false;
    }

    /// Records the failure message; the list stays untouched.
    pub fn fail_fetch_orders(&self, message: impl Into<String>) {
        let mut state = self.write();
        state.loading = false;
        state.error = Some(message.into());
    }

    // ---- create-order triad ----

    pub fn begin_create_order(&self) {
        let mut state = self.write();
        state.loading = true;
        state.error = None;
    }

    /// Prepends the new order and bumps `total_elements` by one.
    ///
    /// Re-invocation with an order already present (same id) replaces
    /// that entry in place without a second increment.
    pub fn complete_create_order(&self, order: Order) {
        let mut state = self.write();
        if let Some(existing) = state.orders.iter_mut().find(|o| o.id == order.id) {
            *existing = order;
        } else {
            state.orders.insert(0, order);
            state.pagination.total_elements = state.pagination.total_elements.saturating_add(1);
        }
        state.loading = false;
    }

    pub fn fail_create_order(&self, message: impl Into<String>) {
        let mut state = self.write();
        state.loading = false;
        state.error = Some(message.into());
    }

    // ---- get-order triad ----

    pub fn begin_get_order(&self) {
        let mut state = self.write();
        state.loading = true;
        state.error = None;
    }

    pub fn complete_get_order(&self, order: Order) {
        let mut state = self.write();
        state.current_order = Some(order);
        state.loading = false;
    }

    pub fn fail_get_order(&self, message: impl Into<String>) {
        let mut state = self.write();
        state.loading = false;
        state.error = Some(message.into());
    }

    // ---- housekeeping ----

    /// Clears `loading` without recording a result. Used when an
    /// in-flight request is abandoned and its outcome must be discarded.
    pub fn abort_request(&self) {
        self.write().loading = false;
    }

    pub fn clear_current_order(&self) {
        self.write().current_order = None;
    }

    pub fn clear_error(&self) {
        self.write().error = None;
    }

    /// Merges the given filters: fields set here overwrite, absent
    /// fields keep their current value. Clearing goes through
    /// [`OrderStore::clear_filters`].
    pub fn set_filters(&self, update: OrderFilters) {
        let mut state = self.write();
        if update.status.is_some() {
            state.filters.status = update.status;
        }
        if update.payment_status.is_some() {
            state.filters.payment_status = update.payment_status;
        }
        if update.search.is_some() {
            state.filters.search = update.search;
        }
    }

    pub fn clear_filters(&self) {
        self.write().filters = OrderFilters::default();
    }

    /// Full reset to the initial state.
    pub fn reset(&self) {
        *self.write() = OrderStoreState::default();
    }

    // ---- reads ----

    pub fn snapshot(&self) -> OrderStoreState {
        self.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    pub fn current_order(&self) -> Option<Order> {
        self.read().current_order.clone()
    }

    pub fn order_by_id(&self, order_id: Uuid) -> Option<Order> {
        self.read().orders.iter().find(|o| o.id == order_id).cloned()
    }
}
