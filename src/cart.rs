//! Cart

use thiserror::Error;

use crate::{
    catalog::{CatalogVariant, VariantUuid},
    money::Amount,
};

/// Errors raised by cart mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// Adding one more of the variant would exceed its available stock.
    #[error("variant {variant_uuid} has only {available} in stock")]
    OutOfStock {
        variant_uuid: VariantUuid,
        available: u32,
    },

    /// The cart holds no line for the given variant.
    #[error("no cart line for variant {0}")]
    LineNotFound(VariantUuid),
}

/// One cart line: a variant, how many of it, and the price it was added at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    variant_uuid: VariantUuid,
    quantity: u32,
    unit_price_snapshot: Amount,
}

impl CartLine {
    /// The variant this line sells.
    pub fn variant_uuid(&self) -> VariantUuid {
        self.variant_uuid
    }

    /// Units of the variant in the cart, always at least one.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// The unit price captured when the line was first added.
    ///
    /// Immutable thereafter, so a catalog price change mid-session cannot
    /// silently reprice a line the customer already saw.
    pub fn unit_price_snapshot(&self) -> Amount {
        self.unit_price_snapshot
    }

    /// This line's contribution to the subtotal.
    pub fn line_total(&self) -> Amount {
        self.unit_price_snapshot.times(self.quantity)
    }
}

/// An in-memory shopping cart, one line per variant.
///
/// Lines keep their insertion order for display; totals do not depend on it.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the variant to the cart, or bumps its quantity by one.
    ///
    /// The unit price is snapshotted on first add.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::OutOfStock`] if the resulting quantity would
    /// exceed the variant's available stock.
    pub fn add_or_increment(&mut self, variant: &CatalogVariant) -> Result<&CartLine, CartError> {
        let position = self
            .lines
            .iter()
            .position(|line| line.variant_uuid == variant.uuid);

        let wanted = position.map_or(1, |i| self.lines[i].quantity + 1);

        if wanted > variant.available_quantity {
            return Err(CartError::OutOfStock {
                variant_uuid: variant.uuid,
                available: variant.available_quantity,
            });
        }

        let index = match position {
            Some(i) => {
                self.lines[i].quantity = wanted;
                i
            }
            None => {
                self.lines.push(CartLine {
                    variant_uuid: variant.uuid,
                    quantity: 1,
                    unit_price_snapshot: variant.unit_price,
                });
                self.lines.len() - 1
            }
        };

        Ok(&self.lines[index])
    }

    /// Decrements the line for the given variant, removing it at zero.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if no line exists for the variant.
    pub fn decrement(&mut self, variant_uuid: VariantUuid) -> Result<(), CartError> {
        let index = self
            .lines
            .iter()
            .position(|line| line.variant_uuid == variant_uuid)
            .ok_or(CartError::LineNotFound(variant_uuid))?;

        if self.lines[index].quantity > 1 {
            self.lines[index].quantity -= 1;
        } else {
            self.lines.remove(index);
        }

        Ok(())
    }

    /// The exact sum of `unit_price_snapshot × quantity` over all lines.
    ///
    /// Recomputed from the lines on every call, never cached.
    pub fn subtotal(&self) -> Amount {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Empties the cart. Idempotent.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// The lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
