//! Till
//!
//! Till is the checkout core of a point-of-sale system: an in-memory cart
//! aggregator with snapshot pricing, a discount policy, and the two-step
//! commit saga that persists a cart as an order plus its line items against
//! a remote order backend.

pub mod backend;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod discount;
pub mod money;

mod uuids;
