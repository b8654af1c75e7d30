//! Order backend

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{catalog::VariantUuid, money::Amount, uuids::TypedUuid};

/// Order UUID
pub type OrderUuid = TypedUuid<ObservedOrder>;

/// Customer UUID
pub type CustomerUuid = TypedUuid<CustomerRecord>;

/// Marker for customer identities owned by the wider platform.
#[derive(Debug, Clone)]
pub struct CustomerRecord {}

/// An order as last observed by the core.
///
/// The backend owns the entity; the core holds only the id and status it
/// last saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedOrder {
    pub uuid: OrderUuid,
    pub status: OrderStatus,
}

/// Lifecycle of an order on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Placed,
    AwaitingLineItems,
    Complete,
    Voided,
}

/// A client-generated token the backend uses to deduplicate retried
/// order-creation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(Uuid);

impl IdempotencyKey {
    /// Wraps an already-derived key value.
    #[must_use]
    pub const fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Wire request for creating the order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_ref: CustomerUuid,
    pub subtotal: Amount,
    pub discount_amount: Amount,
    pub total: Amount,
    pub idempotency_key: IdempotencyKey,
}

/// Wire response to a successful order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_uuid: OrderUuid,
}

/// One line of the batched line-item request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemDraft {
    pub variant_uuid: VariantUuid,
    pub quantity: u32,
    pub unit_price: Amount,
    pub line_total: Amount,
}

/// Wire request for creating an order's line items in one batch.
///
/// Always a single batched call; per-line requests would reintroduce the
/// partial-line inconsistency the batch exists to avoid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLineItemsRequest {
    pub order_uuid: OrderUuid,
    pub lines: Vec<LineItemDraft>,
}

/// Errors returned by the order backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The call did not complete within its deadline.
    #[error("backend call timed out")]
    Timeout,

    /// The backend could not be reached.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The backend rejected the request.
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// The remote order service: source of truth once a commit succeeds.
#[automock]
#[async_trait]
pub trait OrderBackend: Send + Sync {
    /// Creates the order header.
    ///
    /// Deduplicated server-side on the idempotency key: a retry carrying the
    /// same key returns the already-created order instead of a duplicate.
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, BackendError>;

    /// Creates the order's line items in a single batch.
    ///
    /// Idempotent per order: resubmitting the same batch against the same
    /// order must not double-create line items.
    async fn create_line_items(&self, request: CreateLineItemsRequest)
    -> Result<(), BackendError>;

    /// Voids an order left without line items, compensating for a partial
    /// commit that will not be retried.
    async fn void_order(&self, order_uuid: OrderUuid) -> Result<(), BackendError>;
}
