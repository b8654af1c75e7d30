//! Shared test doubles for the checkout scenario tests.

use std::{
    future,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;

use till::backend::{
    BackendError, CreateLineItemsRequest, CreateOrderRequest, CreateOrderResponse, OrderBackend,
    OrderStatus, OrderUuid,
};

/// One order on the stub's ledger.
#[derive(Debug, Clone)]
pub struct StoredOrder {
    pub uuid: OrderUuid,
    pub status: OrderStatus,
    pub request: CreateOrderRequest,
}

#[derive(Debug, Default)]
struct StubState {
    orders: Vec<StoredOrder>,
    line_batches: Vec<CreateLineItemsRequest>,
    order_calls: usize,
    line_item_calls: usize,
    fail_next_create_order: Option<BackendError>,
    fail_next_create_line_items: Option<BackendError>,
    hang_next_create_order: bool,
    hang_next_create_line_items: bool,
}

/// In-memory order backend with scriptable failures and an inspectable
/// ledger.
///
/// Deduplicates order creation on the idempotency key and treats the
/// line-item batch as idempotent per order, matching the contract the
/// real backend is expected to honour.
#[derive(Debug, Default)]
pub struct StubBackend {
    state: Mutex<StubState>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `create_order` call with the given error.
    pub fn fail_next_create_order(&self, error: BackendError) {
        self.lock().fail_next_create_order = Some(error);
    }

    /// Fails the next `create_line_items` call with the given error.
    pub fn fail_next_create_line_items(&self, error: BackendError) {
        self.lock().fail_next_create_line_items = Some(error);
    }

    /// Makes the next `create_order` call hang until its caller times out.
    pub fn hang_next_create_order(&self) {
        self.lock().hang_next_create_order = true;
    }

    /// Makes the next `create_line_items` call hang until its caller times
    /// out.
    pub fn hang_next_create_line_items(&self) {
        self.lock().hang_next_create_line_items = true;
    }

    /// The orders created so far, in creation order.
    pub fn orders(&self) -> Vec<StoredOrder> {
        self.lock().orders.clone()
    }

    /// The line-item batches accepted so far.
    pub fn line_batches(&self) -> Vec<CreateLineItemsRequest> {
        self.lock().line_batches.clone()
    }

    /// Total `create_order` calls, including failed and hung ones.
    pub fn order_calls(&self) -> usize {
        self.lock().order_calls
    }

    /// Total `create_line_items` calls, including failed and hung ones.
    pub fn line_item_calls(&self) -> usize {
        self.lock().line_item_calls
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl OrderBackend for StubBackend {
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, BackendError> {
        let hang = {
            let mut state = self.lock();
            state.order_calls += 1;
            std::mem::take(&mut state.hang_next_create_order)
        };

        if hang {
            return future::pending().await;
        }

        let mut state = self.lock();

        if let Some(error) = state.fail_next_create_order.take() {
            return Err(error);
        }

        // Idempotency-key deduplication: a retry of the same attempt gets
        // the order that already exists instead of a duplicate.
        if let Some(existing) = state
            .orders
            .iter()
            .find(|order| order.request.idempotency_key == request.idempotency_key)
        {
            return Ok(CreateOrderResponse {
                order_uuid: existing.uuid,
            });
        }

        let uuid = OrderUuid::random();

        state.orders.push(StoredOrder {
            uuid,
            status: OrderStatus::AwaitingLineItems,
            request,
        });

        Ok(CreateOrderResponse { order_uuid: uuid })
    }

    async fn create_line_items(
        &self,
        request: CreateLineItemsRequest,
    ) -> Result<(), BackendError> {
        let hang = {
            let mut state = self.lock();
            state.line_item_calls += 1;
            std::mem::take(&mut state.hang_next_create_line_items)
        };

        if hang {
            return future::pending().await;
        }

        let mut guard = self.lock();
        let state = &mut *guard;

        if let Some(error) = state.fail_next_create_line_items.take() {
            return Err(error);
        }

        // Idempotent per order: a resubmitted batch is acknowledged, not
        // double-created.
        if state
            .line_batches
            .iter()
            .any(|batch| batch.order_uuid == request.order_uuid)
        {
            return Ok(());
        }

        let Some(order) = state
            .orders
            .iter_mut()
            .find(|order| order.uuid == request.order_uuid)
        else {
            return Err(BackendError::Rejected("unknown order".to_string()));
        };

        if order.status == OrderStatus::Voided {
            return Err(BackendError::Rejected("order is voided".to_string()));
        }

        order.status = OrderStatus::Complete;
        state.line_batches.push(request);

        Ok(())
    }

    async fn void_order(&self, order_uuid: OrderUuid) -> Result<(), BackendError> {
        let mut state = self.lock();

        let Some(order) = state
            .orders
            .iter_mut()
            .find(|order| order.uuid == order_uuid)
        else {
            return Err(BackendError::Rejected("unknown order".to_string()));
        };

        order.status = OrderStatus::Voided;

        Ok(())
    }
}
