//! Engine configuration.

use crate::error::{BudgetResult, ValidationError};
use crate::settings::DEFAULT_CURRENCY;

/// How the monthly figure is spread over days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RateNormalization {
    /// `monthly_allowance / weighted days of the whole month`.
    ///
    /// The rate is the same on day 1 and day 28, so a user who starts
    /// mid-month gets the figure they would have had from the first.
    #[default]
    FullMonth,
    /// `(total_remaining - savings_pot) / weighted days from today to month end`.
    ///
    /// Surpluses and deficits flow into the following days' figures.
    RemainingDays,
}

/// Tunables for [`crate::BudgetEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Currency prefix written into new settings.
    pub default_currency: String,
    /// Daily-rate normalization.
    pub normalization: RateNormalization,
    /// Reject a second settlement on the same local calendar day.
    pub one_settlement_per_day: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_currency: DEFAULT_CURRENCY.to_string(),
            normalization: RateNormalization::FullMonth,
            one_settlement_per_day: false,
        }
    }
}

impl EngineConfig {
    /// Checks the configuration, returning it unchanged when valid.
    ///
    /// # Errors
    ///
    /// `ValidationError::EmptyCurrency` if the default currency is blank.
    pub fn validate(self) -> BudgetResult<Self> {
        if self.default_currency.trim().is_empty() {
            return Err(ValidationError::EmptyCurrency.into());
        }
        Ok(self)
    }

    /// Sets the default currency.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    /// Sets the normalization mode.
    #[must_use]
    pub const fn with_normalization(mut self, normalization: RateNormalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Enables or disables the one-settlement-per-day rule.
    #[must_use]
    pub const fn with_one_settlement_per_day(mut self, enabled: bool) -> Self {
        self.one_settlement_per_day = enabled;
        self
    }
}
