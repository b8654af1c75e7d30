//! Discounts

use thiserror::Error;

use crate::money::{Amount, MoneyError};

/// Errors raised while validating a discount.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscountError {
    /// The discount exceeds the current subtotal.
    #[error("discount {discount} exceeds subtotal {subtotal}")]
    InvalidDiscount { discount: Amount, subtotal: Amount },

    /// The raw input was not a valid monetary amount.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Validates a manually entered discount against the current subtotal.
///
/// # Errors
///
/// Returns [`DiscountError::InvalidDiscount`] if the discount exceeds the
/// subtotal. Negative discounts are unrepresentable as [`Amount`]; raw input
/// is validated by [`Amount::from_minor`] before it gets here.
pub fn apply(amount: Amount, subtotal: Amount) -> Result<Amount, DiscountError> {
    if amount > subtotal {
        return Err(DiscountError::InvalidDiscount {
            discount: amount,
            subtotal,
        });
    }

    Ok(amount)
}

/// The grand total after discount.
///
/// Clamped at zero, so the total cannot go negative even if discount
/// validation was bypassed upstream.
pub fn total(subtotal: Amount, discount: Amount) -> Amount {
    subtotal.saturating_sub(discount)
}

/// Staged discount entry, mirroring the discount dialog's lifecycle.
///
/// Typed input is held separately from the applied discount and only takes
/// effect on [`DiscountDialog::confirm`]; [`DiscountDialog::cancel`] discards
/// the input and leaves the previously applied discount untouched.
#[derive(Debug, Clone, Default)]
pub struct DiscountDialog {
    applied: Amount,
    input: Option<i64>,
}

impl DiscountDialog {
    /// Creates a dialog with no discount applied.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The discount currently in effect.
    pub fn applied(&self) -> Amount {
        self.applied
    }

    /// Stages raw input in minor units without touching the applied discount.
    pub fn set_input(&mut self, minor: i64) {
        self.input = Some(minor);
    }

    /// Validates the staged input and applies it.
    ///
    /// A confirm with nothing staged keeps the current discount. Invalid
    /// input leaves both the applied discount and the staged input alone so
    /// the user can correct it.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::Money`] for negative input and
    /// [`DiscountError::InvalidDiscount`] for input above the subtotal.
    pub fn confirm(&mut self, subtotal: Amount) -> Result<Amount, DiscountError> {
        let Some(minor) = self.input else {
            return Ok(self.applied);
        };

        let amount = apply(Amount::from_minor(minor)?, subtotal)?;

        self.applied = amount;
        self.input = None;

        Ok(amount)
    }

    /// Discards the staged input; the applied discount is untouched.
    pub fn cancel(&mut self) {
        self.input = None;
    }

    /// Clears both the applied discount and any staged input.
    ///
    /// Used when the cart is cleared or a commit succeeds.
    pub fn reset(&mut self) {
        self.applied = Amount::ZERO;
        self.input = None;
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn minor(value: i64) -> Amount {
        Amount::from_minor(value).expect("amount should be non-negative")
    }

    #[test]
    fn apply_accepts_discount_up_to_subtotal() -> TestResult {
        assert_eq!(apply(minor(0), minor(100))?, minor(0));
        assert_eq!(apply(minor(99), minor(100))?, minor(99));
        assert_eq!(apply(minor(100), minor(100))?, minor(100));

        Ok(())
    }

    #[test]
    fn apply_rejects_discount_over_subtotal() {
        let result = apply(minor(101), minor(100));

        assert_eq!(
            result,
            Err(DiscountError::InvalidDiscount {
                discount: minor(101),
                subtotal: minor(100),
            })
        );
    }

    #[test]
    fn total_never_goes_negative() {
        for (subtotal, discount) in [(0, 0), (100, 0), (100, 100), (100, 40), (50, 100)] {
            let result = total(minor(subtotal), minor(discount));

            assert!(result >= Amount::ZERO);
            assert_eq!(result, minor((subtotal - discount).max(0)));
        }
    }

    #[test]
    fn confirm_applies_staged_input() -> TestResult {
        let mut dialog = DiscountDialog::new();

        dialog.set_input(1_00);

        assert_eq!(dialog.confirm(minor(11_50))?, minor(1_00));
        assert_eq!(dialog.applied(), minor(1_00));

        Ok(())
    }

    #[test]
    fn cancel_preserves_previously_applied_discount() -> TestResult {
        let mut dialog = DiscountDialog::new();

        dialog.set_input(1_00);
        dialog.confirm(minor(11_50))?;

        // Reopen the dialog, type something else, then back out.
        dialog.set_input(5_00);
        dialog.cancel();

        assert_eq!(dialog.applied(), minor(1_00));
        assert_eq!(
            dialog.confirm(minor(11_50))?,
            minor(1_00),
            "a confirm after cancel must not pick up the discarded input"
        );

        Ok(())
    }

    #[test]
    fn confirm_without_input_is_a_no_op() -> TestResult {
        let mut dialog = DiscountDialog::new();

        assert_eq!(dialog.confirm(minor(10_00))?, Amount::ZERO);

        Ok(())
    }

    #[test]
    fn invalid_input_leaves_applied_discount_alone() -> TestResult {
        let mut dialog = DiscountDialog::new();

        dialog.set_input(50);
        dialog.confirm(minor(10_00))?;

        dialog.set_input(-1);
        assert_eq!(
            dialog.confirm(minor(10_00)),
            Err(DiscountError::Money(MoneyError::Negative))
        );

        dialog.set_input(99_99);
        assert!(matches!(
            dialog.confirm(minor(10_00)),
            Err(DiscountError::InvalidDiscount { .. })
        ));

        assert_eq!(dialog.applied(), minor(50));

        Ok(())
    }

    #[test]
    fn reset_clears_applied_discount() -> TestResult {
        let mut dialog = DiscountDialog::new();

        dialog.set_input(50);
        dialog.confirm(minor(10_00))?;
        dialog.reset();

        assert_eq!(dialog.applied(), Amount::ZERO);

        Ok(())
    }
}
