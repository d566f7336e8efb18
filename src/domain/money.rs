//! Integer-cent arithmetic for order totals.
//!
//! Every monetary value in the service is an `i64` count of the smallest
//! currency unit. Floating point never touches a stored amount.

use super::errors::DomainError;

/// Value-added tax applied to every order subtotal, in percent.
pub const TAX_RATE_PERCENT: i64 = 19;

/// `quantity * unit_price`, rejecting results that do not fit in an `i64`.
pub fn line_subtotal(quantity: i32, unit_price_cents: i64) -> Result<i64, DomainError> {
    unit_price_cents
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| DomainError::Validation("line subtotal overflows".to_string()))
}

/// Sum of a sequence of cent amounts, rejecting overflow.
pub fn sum_cents<I>(amounts: I) -> Result<i64, DomainError>
where
    I: IntoIterator<Item = i64>,
{
    amounts.into_iter().try_fold(0i64, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| DomainError::Validation("amount sum overflows".to_string()))
    })
}

/// `floor(subtotal * 0.19)`, computed without floating point.
pub fn tax_for(subtotal_cents: i64) -> i64 {
    // i128 keeps the intermediate product exact for any i64 subtotal.
    let scaled = i128::from(subtotal_cents) * i128::from(TAX_RATE_PERCENT);
    scaled.div_euclid(100) as i64
}

/// The four derived money fields of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

impl Totals {
    /// Totals for a fresh subtotal with no discount applied.
    pub fn from_subtotal(subtotal_cents: i64) -> Result<Self, DomainError> {
        Self::new(subtotal_cents, tax_for(subtotal_cents), 0)
    }

    pub fn new(subtotal_cents: i64, tax_cents: i64, discount_cents: i64) -> Result<Self, DomainError> {
        let total_cents = subtotal_cents
            .checked_add(tax_cents)
            .and_then(|gross| gross.checked_sub(discount_cents))
            .ok_or_else(|| DomainError::Validation("order total overflows".to_string()))?;
        Ok(Self {
            subtotal_cents,
            tax_cents,
            discount_cents,
            total_cents,
        })
    }

    /// Largest discount that keeps the total non-negative.
    pub fn max_discount(&self) -> i64 {
        self.total_cents + self.discount_cents
    }
}
