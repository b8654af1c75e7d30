//! Checkout errors.

use thiserror::Error;

use crate::{
    backend::{BackendError, OrderUuid},
    cart::CartError,
    discount::DiscountError,
};

/// Errors surfaced by the checkout session and its commit saga.
///
/// Validation errors are raised before any network effect and leave the cart
/// unchanged. The two network-stage errors are never conflated: their
/// remediation differs (retry everything versus retry the batch alone).
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no lines; nothing was sent to the backend.
    #[error("cannot commit an empty cart")]
    EmptyCart,

    /// Another commit for this session is still in flight.
    #[error("a commit is already in progress for this session")]
    CommitInProgress,

    /// Order-header creation failed. No order exists; the cart is intact
    /// and the whole commit can be retried.
    #[error("order creation failed")]
    OrderCreateFailed(#[source] BackendError),

    /// The order exists but its line items do not.
    ///
    /// Carries the live order id so the caller can retry the batch with
    /// [`resubmit_line_items`](crate::checkout::CheckoutSession::resubmit_line_items)
    /// or compensate with
    /// [`void_partial_order`](crate::checkout::CheckoutSession::void_partial_order).
    /// The id must not be discarded.
    #[error("line items failed for order {order_uuid}")]
    LineItemsFailed {
        order_uuid: OrderUuid,
        #[source]
        source: BackendError,
    },

    /// Voiding a partially committed order failed; the order is still live
    /// on the backend.
    #[error("failed to void order {order_uuid}")]
    VoidFailed {
        order_uuid: OrderUuid,
        #[source]
        source: BackendError,
    },

    /// No partial commit for the given order is awaiting resolution.
    #[error("no pending order {0} awaiting line items")]
    NoPendingOrder(OrderUuid),

    /// A cart mutation was rejected.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// A discount was rejected.
    #[error(transparent)]
    Discount(#[from] DiscountError),
}
