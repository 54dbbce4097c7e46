//! Money helpers.
//!
//! All amounts are [`Decimal`]s. Figures shown to the user are truncated toward
//! zero at cent granularity, never rounded up.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::ValidationError;

/// Number of fractional digits kept in reported figures.
pub const CENT_SCALE: u32 = 2;

/// Truncates toward zero at cent granularity.
///
/// ```
/// use pocketmoney::money::truncate_to_cents;
/// use rust_decimal::Decimal;
///
/// let v = Decimal::new(158_974, 3); // 158.974
/// assert_eq!(truncate_to_cents(v), Decimal::new(15_897, 2));
/// ```
#[must_use]
pub fn truncate_to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CENT_SCALE, RoundingStrategy::ToZero)
}

/// Rejects values `<= 0`.
pub fn ensure_positive(field: &'static str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::NotPositive { field, value });
    }
    Ok(value)
}

/// Rejects values `< 0`.
pub fn ensure_non_negative(
    field: &'static str,
    value: Decimal,
) -> Result<Decimal, ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(value)
}
