//! Checkout

pub mod draft;
pub mod errors;
pub mod session;

pub use errors::CheckoutError;
pub use session::*;
