//! Month settings document.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::{ensure_non_negative, ensure_positive};

/// Currency prefix used when none is configured.
pub const DEFAULT_CURRENCY: &str = "$";

/// Settings fixed at month initialization and replaced wholesale on re-onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Total funds for the month.
    #[serde(with = "rust_decimal::serde::float")]
    pub monthly_allowance: Decimal,
    /// Weekend-day budget relative to a weekday.
    #[serde(with = "rust_decimal::serde::float")]
    pub weekend_multiplier: Decimal,
    /// Display prefix; no effect on arithmetic.
    pub currency: String,
}

impl Settings {
    /// Validates and builds a settings document.
    ///
    /// # Errors
    ///
    /// Rejects a non-positive allowance, a negative or out-of-range multiplier,
    /// and a blank currency.
    pub fn new(
        monthly_allowance: Decimal,
        weekend_multiplier: Decimal,
        currency: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let currency = currency.into();
        if currency.trim().is_empty() {
            return Err(ValidationError::EmptyCurrency);
        }
        let weekend_multiplier = ensure_non_negative("weekend_multiplier", weekend_multiplier)?;
        // Weighting a month must stay in range: no month has more than 31 days.
        if Decimal::from(31).checked_mul(weekend_multiplier).is_none() {
            return Err(ValidationError::Overflow {
                field: "weekend_multiplier",
            });
        }
        Ok(Self {
            monthly_allowance: ensure_positive("monthly_allowance", monthly_allowance)?,
            weekend_multiplier,
            currency,
        })
    }

    /// Formats an amount with the currency prefix and two decimals.
    #[must_use]
    pub fn format_amount(&self, amount: Decimal) -> String {
        format!("{}{:.2}", self.currency, amount)
    }
}
