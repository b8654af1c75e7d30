//! Order drafts and idempotency-key derivation.

use jiff::Timestamp;
use uuid::Uuid;

use crate::{
    backend::{CustomerUuid, IdempotencyKey, LineItemDraft},
    cart::Cart,
    discount,
    money::Amount,
};

/// Namespace for idempotency-key derivation; keys are v5 UUIDs over the
/// draft fingerprint within this namespace.
const IDEMPOTENCY_NAMESPACE: Uuid = Uuid::from_u128(0x9f2c_1b6a_74d3_4e08_b1aa_52c07d9e6f31);

/// A point-in-time snapshot of the cart, priced and ready to persist.
///
/// Derived fresh from the cart and discount at commit time; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub lines: Vec<LineItemDraft>,
    pub subtotal: Amount,
    pub discount_amount: Amount,
    pub total: Amount,
    pub customer_ref: CustomerUuid,
}

impl OrderDraft {
    /// Prices the cart into a draft for the given customer.
    #[must_use]
    pub fn from_cart(cart: &Cart, discount_amount: Amount, customer_ref: CustomerUuid) -> Self {
        let lines = cart
            .lines()
            .iter()
            .map(|line| LineItemDraft {
                variant_uuid: line.variant_uuid(),
                quantity: line.quantity(),
                unit_price: line.unit_price_snapshot(),
                line_total: line.line_total(),
            })
            .collect();

        let subtotal = cart.subtotal();
        let total = discount::total(subtotal, discount_amount);

        Self {
            lines,
            subtotal,
            discount_amount,
            total,
            customer_ref,
        }
    }

    /// Derives the idempotency key for this draft and attempt.
    ///
    /// Deterministic over the draft's content and the attempt timestamp, so
    /// resubmitting the identical draft under the same attempt carries the
    /// same key and the backend can deduplicate it.
    #[must_use]
    pub fn idempotency_key(&self, attempt_at: Timestamp) -> IdempotencyKey {
        let mut fingerprint = Vec::new();

        fingerprint.extend_from_slice(self.customer_ref.into_uuid().as_bytes());

        for line in &self.lines {
            fingerprint.extend_from_slice(line.variant_uuid.into_uuid().as_bytes());
            fingerprint.extend_from_slice(&line.quantity.to_be_bytes());
            fingerprint.extend_from_slice(line.unit_price.to_string().as_bytes());
        }

        fingerprint.extend_from_slice(self.subtotal.to_string().as_bytes());
        fingerprint.extend_from_slice(self.discount_amount.to_string().as_bytes());
        fingerprint.extend_from_slice(self.total.to_string().as_bytes());
        fingerprint.extend_from_slice(&attempt_at.as_nanosecond().to_be_bytes());

        IdempotencyKey::new(Uuid::new_v5(&IDEMPOTENCY_NAMESPACE, &fingerprint))
    }
}
