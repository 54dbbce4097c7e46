//! Running budget state and its component records.
//!
//! [`BudgetState`] is the only document mutated during normal operation:
//! settlements append to the history, expiry pruning removes deductions.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the user chose to absorb the day's surplus or deficit.
///
/// Serialized with the historic wire tags `save`, `spread`, `week` and `month`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementAction {
    /// Move the surplus into the savings pot.
    #[serde(rename = "save")]
    Save,
    /// Leave the surplus in the running total for later days.
    #[serde(rename = "spread")]
    Spread,
    /// Absorb the deficit within the current week.
    #[serde(rename = "week")]
    FixWeek,
    /// Absorb the deficit across the rest of the month.
    #[serde(rename = "month")]
    SpreadLoss,
}

impl SettlementAction {
    /// All actions, surplus first.
    pub const ALL: [Self; 4] = [Self::Save, Self::Spread, Self::FixWeek, Self::SpreadLoss];

    /// True for the actions offered after an under-budget day.
    #[must_use]
    pub const fn is_surplus_action(self) -> bool {
        matches!(self, Self::Save | Self::Spread)
    }

    /// Wire tag of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Spread => "spread",
            Self::FixWeek => "week",
            Self::SpreadLoss => "month",
        }
    }

    /// Parses a wire tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == tag)
    }

    /// History `diff` for an unsigned `amount`: positive for a surplus, negative for a deficit.
    #[must_use]
    pub fn signed_diff(self, amount: Decimal) -> Decimal {
        if self.is_surplus_action() {
            amount
        } else {
            -amount
        }
    }
}

impl std::fmt::Display for SettlementAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of comparing a day's budget with what was spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOutcome {
    /// Spent at most the budget; holds `budget - spent`.
    Surplus(Decimal),
    /// Overspent; holds `spent - budget`.
    Deficit(Decimal),
}

impl DayOutcome {
    /// Classifies `daily_budget - spent`; a zero difference counts as a surplus.
    #[must_use]
    pub fn from_spend(daily_budget: Decimal, spent: Decimal) -> Self {
        let diff = daily_budget - spent;
        if diff.is_sign_negative() && !diff.is_zero() {
            Self::Deficit(diff.abs())
        } else {
            Self::Surplus(diff.abs())
        }
    }

    /// Unsigned magnitude, the `amount` to settle with.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        match self {
            Self::Surplus(a) | Self::Deficit(a) => *a,
        }
    }

    /// Actions that may be chosen for this outcome.
    #[must_use]
    pub const fn actions(&self) -> [SettlementAction; 2] {
        match self {
            Self::Surplus(_) => [SettlementAction::Spread, SettlementAction::Save],
            Self::Deficit(_) => [SettlementAction::FixWeek, SettlementAction::SpreadLoss],
        }
    }

    /// Whether `action` belongs to this outcome.
    #[must_use]
    pub fn permits(&self, action: SettlementAction) -> bool {
        self.actions().contains(&action)
    }

    /// `"surplus"` or `"deficit"`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Surplus(_) => "surplus",
            Self::Deficit(_) => "deficit",
        }
    }
}

/// One settled day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the settlement happened.
    pub date: DateTime<Utc>,
    /// Amount spent that day.
    #[serde(with = "rust_decimal::serde::float")]
    pub spent: Decimal,
    /// The chosen disposition.
    pub action: SettlementAction,
    /// Surplus (positive) or deficit (negative).
    #[serde(with = "rust_decimal::serde::float")]
    pub diff: Decimal,
}

/// Time-bounded subtraction from every day's budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryDeduction {
    /// Subtracted from each day's budget while active.
    #[serde(with = "rust_decimal::serde::float")]
    pub daily_amount: Decimal,
    /// Exclusive end; stored as epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_date: DateTime<Utc>,
}

impl TemporaryDeduction {
    /// Active while `end_date > now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.end_date > now
    }
}

/// The running totals mutated by settlement and pruning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetState {
    /// Funds not yet spent; may go negative.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_remaining: Decimal,
    /// Funds set aside as savings.
    #[serde(with = "rust_decimal::serde::float")]
    pub savings_pot: Decimal,
    /// Last persisted mutation.
    pub last_updated: DateTime<Utc>,
    /// Append-only, chronological.
    pub daily_history: Vec<HistoryEntry>,
    /// Pruned whenever the daily budget is computed.
    pub temporary_deductions: Vec<TemporaryDeduction>,
}

impl BudgetState {
    /// Fresh state for a new period.
    #[must_use]
    pub fn fresh(monthly_allowance: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            total_remaining: monthly_allowance,
            savings_pot: Decimal::ZERO,
            last_updated: now,
            daily_history: Vec::new(),
            temporary_deductions: Vec::new(),
        }
    }

    /// Funds not committed to savings, saturating at the decimal range.
    #[must_use]
    pub fn available_budget(&self) -> Decimal {
        self.total_remaining.saturating_sub(self.savings_pot)
    }

    /// Removes deductions with `end_date <= now`; returns how many were removed.
    pub fn prune_expired_deductions(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.temporary_deductions.len();
        self.temporary_deductions.retain(|d| d.is_active_at(now));
        before - self.temporary_deductions.len()
    }

    /// Sum of `daily_amount` over deductions active at `now`, saturating.
    #[must_use]
    pub fn active_deduction_total(&self, now: DateTime<Utc>) -> Decimal {
        self.temporary_deductions
            .iter()
            .filter(|d| d.is_active_at(now))
            .fold(Decimal::ZERO, |acc, d| acc.saturating_add(d.daily_amount))
    }

    /// True if any entry was settled on the given calendar day (in `offset`'s local time).
    #[must_use]
    pub fn settled_on<Tz: chrono::TimeZone>(&self, day: NaiveDate, offset: &Tz) -> bool {
        self.daily_history
            .iter()
            .any(|e| e.date.with_timezone(offset).date_naive() == day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, TimeZone};
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_action_wire_tags() {
        assert_eq!(serde_json::to_value(SettlementAction::FixWeek).unwrap(), "week");
        assert_eq!(serde_json::to_value(SettlementAction::SpreadLoss).unwrap(), "month");
        let parsed: SettlementAction = serde_json::from_value(serde_json::json!("save")).unwrap();
        assert_eq!(parsed, SettlementAction::Save);
        assert_eq!(SettlementAction::from_tag("spread"), Some(SettlementAction::Spread));
        assert_eq!(SettlementAction::from_tag("piggy"), None);
    }

    #[test]
    fn test_signed_diff() {
        assert_eq!(SettlementAction::Save.signed_diff(dec!(30)), dec!(30));
        assert_eq!(SettlementAction::Spread.signed_diff(dec!(5)), dec!(5));
        assert_eq!(SettlementAction::FixWeek.signed_diff(dec!(12.5)), dec!(-12.5));
        assert_eq!(SettlementAction::SpreadLoss.signed_diff(dec!(1)), dec!(-1));
    }

    #[test]
    fn test_day_outcome() {
        let outcome = DayOutcome::from_spend(dec!(80), dec!(50));
        assert_eq!(outcome, DayOutcome::Surplus(dec!(30)));
        assert!(outcome.permits(SettlementAction::Save));
        assert!(!outcome.permits(SettlementAction::FixWeek));

        let outcome = DayOutcome::from_spend(dec!(80), dec!(95.5));
        assert_eq!(outcome, DayOutcome::Deficit(dec!(15.5)));
        assert_eq!(outcome.amount(), dec!(15.5));
        assert_eq!(outcome.kind(), "deficit");

        // Exactly on budget is a zero surplus.
        assert_eq!(DayOutcome::from_spend(dec!(40), dec!(40)), DayOutcome::Surplus(dec!(0)));
    }

    #[test]
    fn test_deduction_end_date_is_epoch_millis() {
        let d = TemporaryDeduction {
            daily_amount: dec!(5),
            end_date: at(2024, 7, 10, 0),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["endDate"], serde_json::json!(1_720_569_600_000_i64));
        assert_eq!(json["dailyAmount"], serde_json::json!(5.0));
    }

    #[test]
    fn test_prune_expired_deductions() {
        let now = at(2024, 7, 10, 12);
        let mut state = BudgetState::fresh(dec!(1000), now);
        state.temporary_deductions = vec![
            TemporaryDeduction { daily_amount: dec!(5), end_date: now - Duration::days(1) },
            TemporaryDeduction { daily_amount: dec!(7), end_date: now },
            TemporaryDeduction { daily_amount: dec!(3), end_date: now + Duration::days(2) },
        ];
        assert_eq!(state.active_deduction_total(now), dec!(3));
        assert_eq!(state.prune_expired_deductions(now), 2);
        assert_eq!(state.temporary_deductions.len(), 1);
        assert_eq!(state.prune_expired_deductions(now), 0);
    }

    #[test]
    fn test_available_budget_saturates() {
        let now = at(2024, 7, 10, 12);
        let mut state = BudgetState::fresh(dec!(100), now);
        state.savings_pot = dec!(30);
        assert_eq!(state.available_budget(), dec!(70));

        state.total_remaining = Decimal::MIN;
        state.savings_pot = Decimal::MAX;
        assert_eq!(state.available_budget(), Decimal::MIN);
    }

    #[test]
    fn test_state_json_shape() {
        let now = at(2024, 7, 10, 12);
        let state = BudgetState::fresh(dec!(1000), now);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["totalRemaining"], serde_json::json!(1000.0));
        assert_eq!(json["savingsPot"], serde_json::json!(0.0));
        assert_eq!(json["lastUpdated"], "2024-07-10T12:00:00Z");
        assert!(json["dailyHistory"].as_array().unwrap().is_empty());
        assert!(json["temporaryDeductions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_settled_on_uses_local_day() {
        let mut state = BudgetState::fresh(dec!(1000), at(2024, 7, 1, 0));
        state.daily_history.push(HistoryEntry {
            date: at(2024, 7, 6, 23),
            spent: dec!(10),
            action: SettlementAction::Spread,
            diff: dec!(2),
        });
        let utc = FixedOffset::east_opt(0).unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let sat = NaiveDate::from_ymd_opt(2024, 7, 6).unwrap();
        let sun = NaiveDate::from_ymd_opt(2024, 7, 7).unwrap();
        assert!(state.settled_on(sat, &utc));
        assert!(state.settled_on(sun, &plus_two));
        assert!(!state.settled_on(sat, &plus_two));
    }
}
