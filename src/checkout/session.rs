//! Checkout session and the order commit saga.
//!
//! Persisting a cart takes two dependent network calls: create the order
//! header, then create its line items. The calls are not atomic, so the
//! session drives them as an explicit state machine with an idempotency key
//! on the first call and a retryable batch on the second, and exposes the
//! partial-commit window as its own terminal state rather than folding it
//! into plain success or failure.

use std::{
    future::Future,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use jiff::Timestamp;
use tracing::{Span, info, warn};

use crate::{
    backend::{
        BackendError, CreateLineItemsRequest, CreateOrderRequest, CustomerUuid, IdempotencyKey,
        OrderBackend, OrderUuid,
    },
    cart::{Cart, CartLine},
    catalog::{CatalogVariant, VariantUuid},
    checkout::{draft::OrderDraft, errors::CheckoutError},
    discount::DiscountDialog,
    money::Amount,
};

/// States of the commit saga, per checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState {
    /// No commit has been attempted for the current cart.
    Idle,
    /// The order-header call is in flight.
    CreatingOrder,
    /// The order exists; the line-item batch is in flight.
    CreatingLineItems,
    /// Both calls succeeded; the cart has been cleared.
    Committed,
    /// The order exists server-side with no line items. Requires explicit
    /// resolution: resubmit the batch or void the order.
    PartiallyCommitted,
    /// Order creation failed; no order exists and the cart is retained.
    Failed,
}

/// Deadlines for the saga's two backend calls.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub order_timeout: Duration,
    pub line_items_timeout: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            order_timeout: Duration::from_secs(10),
            line_items_timeout: Duration::from_secs(10),
        }
    }
}

/// Proof of a fully committed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub order_uuid: OrderUuid,
    pub committed_at: Timestamp,
}

#[derive(Debug)]
struct SessionState {
    cart: Cart,
    discount: DiscountDialog,
    attempt_key: Option<IdempotencyKey>,
    pending_order: Option<OrderUuid>,
    commit_state: CommitState,
}

/// One customer's checkout session: the cart, the discount dialog, and the
/// commit saga, owned together.
///
/// The customer reference is injected at construction; nothing is read from
/// ambient state. A single in-flight gate serialises commits: a second
/// [`commit`](CheckoutSession::commit) or any cart mutation issued while one
/// is outstanding is rejected with [`CheckoutError::CommitInProgress`], so
/// what the backend receives is exactly what the caller saw.
///
/// Cancellation is only meaningful before the first network call: once the
/// order header exists remotely, the attempt runs to a terminal state
/// regardless of user intent.
#[derive(Debug)]
pub struct CheckoutSession {
    customer_ref: CustomerUuid,
    config: CheckoutConfig,
    state: Mutex<SessionState>,
    in_flight: AtomicBool,
}

impl CheckoutSession {
    /// Creates a session for the given customer.
    #[must_use]
    pub fn new(customer_ref: CustomerUuid, config: CheckoutConfig) -> Self {
        Self {
            customer_ref,
            config,
            state: Mutex::new(SessionState {
                cart: Cart::new(),
                discount: DiscountDialog::new(),
                attempt_key: None,
                pending_order: None,
                commit_state: CommitState::Idle,
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    /// The customer this session checks out for.
    pub fn customer_ref(&self) -> CustomerUuid {
        self.customer_ref
    }

    /// Adds the variant to the cart, or bumps its quantity by one.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::CommitInProgress`] while a commit is in
    /// flight, or the underlying [`CartError`](crate::cart::CartError).
    pub fn add_variant(&self, variant: &CatalogVariant) -> Result<CartLine, CheckoutError> {
        let mut state = self.guarded_state()?;

        let line = state.cart.add_or_increment(variant)?.clone();
        state.invalidate_attempt();

        Ok(line)
    }

    /// Decrements the line for the given variant, removing it at zero.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::CommitInProgress`] while a commit is in
    /// flight, or the underlying [`CartError`](crate::cart::CartError).
    pub fn decrement(&self, variant_uuid: VariantUuid) -> Result<(), CheckoutError> {
        let mut state = self.guarded_state()?;

        state.cart.decrement(variant_uuid)?;
        state.invalidate_attempt();

        Ok(())
    }

    /// Empties the cart and resets the discount. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::CommitInProgress`] while a commit is in
    /// flight.
    pub fn clear_cart(&self) -> Result<(), CheckoutError> {
        let mut state = self.guarded_state()?;

        state.cart.clear();
        state.discount.reset();
        state.invalidate_attempt();
        state.commit_state = CommitState::Idle;

        Ok(())
    }

    /// The cart's current subtotal.
    pub fn subtotal(&self) -> Amount {
        self.lock().cart.subtotal()
    }

    /// The cart lines in insertion order.
    pub fn lines(&self) -> Vec<CartLine> {
        self.lock().cart.lines().to_vec()
    }

    /// The discount currently in effect.
    pub fn applied_discount(&self) -> Amount {
        self.lock().discount.applied()
    }

    /// The grand total the backend would be asked to persist right now.
    pub fn total(&self) -> Amount {
        let state = self.lock();

        crate::discount::total(state.cart.subtotal(), state.discount.applied())
    }

    /// Stages discount input without applying it.
    pub fn stage_discount(&self, minor: i64) {
        self.lock().discount.set_input(minor);
    }

    /// Confirms the staged discount input against the current subtotal.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::CommitInProgress`] while a commit is in
    /// flight, or the underlying
    /// [`DiscountError`](crate::discount::DiscountError).
    pub fn confirm_discount(&self) -> Result<Amount, CheckoutError> {
        let mut state = self.guarded_state()?;

        let subtotal = state.cart.subtotal();
        let applied = state.discount.confirm(subtotal)?;
        state.invalidate_attempt();

        Ok(applied)
    }

    /// Discards staged discount input; the applied discount is untouched.
    pub fn cancel_discount(&self) {
        self.lock().discount.cancel();
    }

    /// The saga state as of the most recent attempt.
    pub fn commit_state(&self) -> CommitState {
        self.lock().commit_state
    }

    /// The order left behind by a partial commit, if any.
    pub fn pending_order(&self) -> Option<OrderUuid> {
        self.lock().pending_order
    }

    /// Commits the cart: creates the order header, then its line items.
    ///
    /// On success the cart is cleared, the discount reset, and a receipt
    /// returned. On failure the cart is always retained so the customer's
    /// intent is not lost.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::EmptyCart`]: rejected before any network call.
    /// - [`CheckoutError::CommitInProgress`]: another commit is outstanding.
    /// - [`CheckoutError::OrderCreateFailed`]: step one failed or timed out;
    ///   no order exists.
    /// - [`CheckoutError::LineItemsFailed`]: step two failed or timed out;
    ///   the order id it carries is live and must be resolved.
    #[tracing::instrument(
        name = "checkout.session.commit",
        skip(self, backend),
        fields(
            customer_ref = %self.customer_ref,
            line_count = tracing::field::Empty,
            order_uuid = tracing::field::Empty,
        ),
        err
    )]
    pub async fn commit(&self, backend: &dyn OrderBackend) -> Result<CommitReceipt, CheckoutError> {
        let _gate = InFlightGate::acquire(&self.in_flight)?;

        let (draft, key) = {
            let mut state = self.lock();

            if state.cart.is_empty() {
                return Err(CheckoutError::EmptyCart);
            }

            let draft =
                OrderDraft::from_cart(&state.cart, state.discount.applied(), self.customer_ref);

            // Reuse the key while the cart is unchanged so a resubmission of
            // the same attempt deduplicates server-side.
            let key = *state
                .attempt_key
                .get_or_insert_with(|| draft.idempotency_key(Timestamp::now()));

            state.commit_state = CommitState::CreatingOrder;

            (draft, key)
        };

        let span = Span::current();
        span.record("line_count", draft.lines.len());

        let request = CreateOrderRequest {
            customer_ref: draft.customer_ref,
            subtotal: draft.subtotal,
            discount_amount: draft.discount_amount,
            total: draft.total,
            idempotency_key: key,
        };

        let response =
            match with_deadline(self.config.order_timeout, backend.create_order(request)).await {
                Ok(response) => response,
                Err(cause) => {
                    self.lock().commit_state = CommitState::Failed;

                    return Err(CheckoutError::OrderCreateFailed(cause));
                }
            };

        let order_uuid = response.order_uuid;
        span.record("order_uuid", tracing::field::display(order_uuid));

        self.lock().commit_state = CommitState::CreatingLineItems;

        let batch = CreateLineItemsRequest {
            order_uuid,
            lines: draft.lines,
        };

        match with_deadline(
            self.config.line_items_timeout,
            backend.create_line_items(batch),
        )
        .await
        {
            Ok(()) => {
                self.finalize_committed();

                info!(%order_uuid, "order committed");

                Ok(CommitReceipt {
                    order_uuid,
                    committed_at: Timestamp::now(),
                })
            }
            Err(cause) => {
                let mut state = self.lock();
                state.commit_state = CommitState::PartiallyCommitted;
                state.pending_order = Some(order_uuid);
                drop(state);

                warn!(%order_uuid, "order created but line items failed");

                Err(CheckoutError::LineItemsFailed { order_uuid, source: cause })
            }
        }
    }

    /// Retries the line-item batch alone against an order left behind by a
    /// partial commit. On success the session finalises exactly as
    /// [`commit`](CheckoutSession::commit) would.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::CommitInProgress`]: another commit is outstanding.
    /// - [`CheckoutError::NoPendingOrder`]: the given order is not awaiting
    ///   line items (or the cart changed since the partial commit).
    /// - [`CheckoutError::LineItemsFailed`]: the retry itself failed; the
    ///   order id remains live.
    #[tracing::instrument(
        name = "checkout.session.resubmit_line_items",
        skip(self, backend),
        fields(customer_ref = %self.customer_ref, order_uuid = %order_uuid),
        err
    )]
    pub async fn resubmit_line_items(
        &self,
        backend: &dyn OrderBackend,
        order_uuid: OrderUuid,
    ) -> Result<CommitReceipt, CheckoutError> {
        let _gate = InFlightGate::acquire(&self.in_flight)?;

        let batch = {
            let state = self.lock();

            if state.pending_order != Some(order_uuid) {
                return Err(CheckoutError::NoPendingOrder(order_uuid));
            }

            let draft =
                OrderDraft::from_cart(&state.cart, state.discount.applied(), self.customer_ref);

            CreateLineItemsRequest {
                order_uuid,
                lines: draft.lines,
            }
        };

        match with_deadline(
            self.config.line_items_timeout,
            backend.create_line_items(batch),
        )
        .await
        {
            Ok(()) => {
                self.finalize_committed();

                info!(%order_uuid, "order committed after line-item retry");

                Ok(CommitReceipt {
                    order_uuid,
                    committed_at: Timestamp::now(),
                })
            }
            Err(cause) => {
                warn!(%order_uuid, "line-item retry failed");

                Err(CheckoutError::LineItemsFailed { order_uuid, source: cause })
            }
        }
    }

    /// Voids an order left behind by a partial commit, keeping the cart so
    /// the customer can start the whole saga over.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::CommitInProgress`]: another commit is outstanding.
    /// - [`CheckoutError::NoPendingOrder`]: the given order is not awaiting
    ///   resolution.
    /// - [`CheckoutError::VoidFailed`]: the compensating call failed; the
    ///   order is still live.
    #[tracing::instrument(
        name = "checkout.session.void_partial_order",
        skip(self, backend),
        fields(customer_ref = %self.customer_ref, order_uuid = %order_uuid),
        err
    )]
    pub async fn void_partial_order(
        &self,
        backend: &dyn OrderBackend,
        order_uuid: OrderUuid,
    ) -> Result<(), CheckoutError> {
        let _gate = InFlightGate::acquire(&self.in_flight)?;

        if self.lock().pending_order != Some(order_uuid) {
            return Err(CheckoutError::NoPendingOrder(order_uuid));
        }

        match with_deadline(self.config.order_timeout, backend.void_order(order_uuid)).await {
            Ok(()) => {
                let mut state = self.lock();
                state.pending_order = None;
                // The voided order consumed this attempt's key; the next
                // commit must derive a fresh one.
                state.attempt_key = None;
                state.commit_state = CommitState::Idle;

                info!(%order_uuid, "voided partially committed order");

                Ok(())
            }
            Err(cause) => Err(CheckoutError::VoidFailed { order_uuid, source: cause }),
        }
    }

    fn finalize_committed(&self) {
        let mut state = self.lock();

        state.cart.clear();
        state.discount.reset();
        state.attempt_key = None;
        state.pending_order = None;
        state.commit_state = CommitState::Committed;
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn guarded_state(&self) -> Result<MutexGuard<'_, SessionState>, CheckoutError> {
        let state = self.lock();

        if self.in_flight.load(Ordering::Acquire) {
            return Err(CheckoutError::CommitInProgress);
        }

        Ok(state)
    }
}

impl SessionState {
    /// Any change to the cart or discount starts a fresh attempt: the old
    /// key no longer describes what would be sent, and a pending batch no
    /// longer matches the cart.
    fn invalidate_attempt(&mut self) {
        self.attempt_key = None;
        self.pending_order = None;
        self.commit_state = CommitState::Idle;
    }
}

/// Single-in-flight gate. Released on drop, including when a commit future
/// is cancelled before its first network call.
struct InFlightGate<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGate<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, CheckoutError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CheckoutError::CommitInProgress)?;

        Ok(Self { flag })
    }
}

impl Drop for InFlightGate<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

async fn with_deadline<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, BackendError> {
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout),
    }
}
