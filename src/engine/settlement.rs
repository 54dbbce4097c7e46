//! End-of-day settlement state transition.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::ensure_non_negative;
use crate::state::{BudgetState, HistoryEntry, SettlementAction};

/// Applies one day's outcome to `state` and returns the appended history entry.
///
/// `total_remaining` always drops by `spent`. Only [`SettlementAction::Save`]
/// moves money: `amount` goes into the savings pot. The other actions record
/// the user's intent without further adjustment.
///
/// On error `state` is left untouched.
pub fn apply_settlement(
    state: &mut BudgetState,
    spent: Decimal,
    action: SettlementAction,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Result<HistoryEntry, ValidationError> {
    let spent = ensure_non_negative("spent", spent)?;
    let amount = ensure_non_negative("amount", amount)?;

    let total_remaining = state
        .total_remaining
        .checked_sub(spent)
        .ok_or(ValidationError::Overflow { field: "spent" })?;

    let savings_pot = match action {
        SettlementAction::Save => state
            .savings_pot
            .checked_add(amount)
            .ok_or(ValidationError::Overflow { field: "amount" })?,
        SettlementAction::Spread | SettlementAction::FixWeek | SettlementAction::SpreadLoss => {
            state.savings_pot
        }
    };

    let entry = HistoryEntry {
        date: now,
        spent,
        action,
        diff: action.signed_diff(amount),
    };

    state.total_remaining = total_remaining;
    state.savings_pot = savings_pot;
    state.daily_history.push(entry.clone());
    Ok(entry)
}
