//! Error types for pocketmoney.
//!
//! All errors are strongly typed using thiserror so callers can branch on
//! the specific condition instead of inspecting sentinel values.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::storage::StorageError;

/// Validation errors raised at the engine boundary before any state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Amount must be strictly greater than zero.
    #[error("{field} must be positive (got {value})")]
    NotPositive {
        /// Name of the offending input.
        field: &'static str,
        /// The rejected value.
        value: Decimal,
    },

    /// Amount must be zero or greater.
    #[error("{field} must not be negative (got {value})")]
    Negative {
        /// Name of the offending input.
        field: &'static str,
        /// The rejected value.
        value: Decimal,
    },

    /// Arithmetic on the amount would leave the decimal range.
    #[error("{field} is out of range")]
    Overflow {
        /// Name of the offending input.
        field: &'static str,
    },

    /// A deduction must end after the moment it is added.
    #[error("Deduction end date {end_date} is not after {now}")]
    EndDateInPast {
        /// Requested end of the deduction.
        end_date: DateTime<Utc>,
        /// Evaluation instant.
        now: DateTime<Utc>,
    },

    /// A currency symbol may not be blank.
    #[error("Currency symbol cannot be empty")]
    EmptyCurrency,

    /// The chosen settlement action does not belong to the day's outcome.
    #[error("Action '{action}' does not apply to a {outcome}")]
    ActionMismatch {
        /// Action requested by the caller.
        action: String,
        /// Outcome kind (surplus or deficit).
        outcome: &'static str,
    },
}

/// Execution errors: the input was fine but the operation cannot run now.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Settings or State have not been created yet.
    #[error("Budget has not been initialized; run month initialization first")]
    NotOnboarded,

    /// The day has already been settled and the engine enforces one settlement per day.
    #[error("Day {date} has already been settled")]
    AlreadySettled {
        /// Calendar day that already carries a settlement.
        date: NaiveDate,
    },

    /// A persisted document could not be decoded into the expected schema.
    #[error("Stored document '{key}' is invalid: {message}")]
    CorruptDocument {
        /// Store key of the document.
        key: String,
        /// Decoder message.
        message: String,
    },
}

/// Top-level error type for pocketmoney.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Input rejected at the boundary.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Operation precondition failed.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// The document store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invariant broken inside the engine.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the broken invariant.
        message: String,
    },
}

impl BudgetError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if the failure is caused by missing onboarding.
    #[must_use]
    pub const fn is_not_onboarded(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::NotOnboarded))
    }

    /// Returns true if retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Execution(_) | Self::Internal { .. } => false,
            Self::Storage(e) => matches!(e, StorageError::Locked(_)),
        }
    }
}

/// Result type alias for pocketmoney operations.
pub type BudgetResult<T> = Result<T, BudgetError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validation_error_not_positive() {
        let err = ValidationError::NotPositive {
            field: "monthly_allowance",
            value: dec!(-5),
        };
        let msg = format!("{err}");
        assert!(msg.contains("monthly_allowance"));
        assert!(msg.contains("-5"));
    }

    #[test]
    fn test_validation_error_overflow() {
        let err = ValidationError::Overflow {
            field: "weekend_multiplier",
        };
        assert!(err.to_string().contains("weekend_multiplier"));
        assert!(BudgetError::from(err).is_validation());
    }

    #[test]
    fn test_execution_error_already_settled() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 6).unwrap();
        let err = ExecutionError::AlreadySettled { date };
        assert!(err.to_string().contains("2024-07-06"));
    }

    #[test]
    fn test_budget_error_from_validation() {
        let err: BudgetError = ValidationError::EmptyCurrency.into();
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_budget_error_not_onboarded() {
        let err: BudgetError = ExecutionError::NotOnboarded.into();
        assert!(err.is_execution());
        assert!(err.is_not_onboarded());
    }

    #[test]
    fn test_budget_error_storage_retryable() {
        let err: BudgetError = StorageError::Locked("held elsewhere".to_string()).into();
        assert!(err.is_storage());
        assert!(err.is_retryable());

        let err: BudgetError = StorageError::BackendError("disk full".to_string()).into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_budget_error_internal() {
        let err = BudgetError::internal("engine lock poisoned");
        assert!(!err.is_validation());
        assert!(err.to_string().contains("engine lock poisoned"));
    }
}
