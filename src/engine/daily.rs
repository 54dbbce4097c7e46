//! Daily budget computation.
//!
//! Turns (allowance, calendar position, remaining funds, active deductions)
//! into one day's spending limit. The only side effect is pruning expired
//! deductions out of the state handed in; persisting that is the caller's job.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::calendar::{is_weekend, MonthCalendar};
use crate::config::RateNormalization;
use crate::money::truncate_to_cents;
use crate::settings::Settings;
use crate::state::BudgetState;

/// Every intermediate figure of one daily-budget computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBudget {
    /// Weighted day count the rate was normalized over.
    pub weighted_days: Decimal,
    /// Per-weekday rate before deductions.
    pub base_rate: Decimal,
    /// Whether the evaluation day is a Saturday or Sunday.
    pub is_weekend: bool,
    /// Rate for the evaluation day before deductions and cap.
    pub nominal: Decimal,
    /// Sum of active deductions.
    pub deductions: Decimal,
    /// `total_remaining - savings_pot`.
    pub available: Decimal,
    /// Final figure: capped, floored at zero, truncated to cents.
    pub amount: Decimal,
    /// Number of expired deductions removed from the state.
    #[serde(skip)]
    pub pruned: usize,
}

impl DailyBudget {
    fn zero(is_weekend: bool, deductions: Decimal, available: Decimal, pruned: usize) -> Self {
        Self {
            weighted_days: Decimal::ZERO,
            base_rate: Decimal::ZERO,
            is_weekend,
            nominal: Decimal::ZERO,
            deductions,
            available,
            amount: Decimal::ZERO,
            pruned,
        }
    }
}

/// Computes today's limit and prunes expired deductions from `state`.
///
/// Deductions with `end_date <= now` are removed before the active total is
/// taken. A weighted day count that is non-positive or out of range yields
/// zero rather than dividing.
#[must_use]
pub fn compute_daily_budget(
    settings: &Settings,
    state: &mut BudgetState,
    now: DateTime<FixedOffset>,
    normalization: RateNormalization,
) -> DailyBudget {
    let now_utc = now.with_timezone(&Utc);
    let today = now.date_naive();
    let weekend = is_weekend(today);

    let pruned = state.prune_expired_deductions(now_utc);
    let deductions = state.active_deduction_total(now_utc);
    let available = state.available_budget();

    let calendar = MonthCalendar::containing(today);
    let split = match normalization {
        RateNormalization::FullMonth => calendar.split(),
        RateNormalization::RemainingDays => calendar.split_remaining(today),
    };
    let multiplier = settings.weekend_multiplier;
    let weighted_days = match split.weighted(multiplier) {
        Some(w) if w > Decimal::ZERO => w,
        _ => return DailyBudget::zero(weekend, deductions, available, pruned),
    };

    let pool = match normalization {
        RateNormalization::FullMonth => settings.monthly_allowance,
        RateNormalization::RemainingDays => available,
    };
    // Saturate on overflow; the cap to `available` below bounds the result anyway.
    let base_rate = pool.checked_div(weighted_days).unwrap_or(Decimal::MAX);
    let nominal = if weekend {
        base_rate.saturating_mul(multiplier)
    } else {
        base_rate
    };

    let amount = nominal
        .saturating_sub(deductions)
        .min(available)
        .max(Decimal::ZERO);

    DailyBudget {
        weighted_days,
        base_rate,
        is_weekend: weekend,
        nominal,
        deductions,
        available,
        amount: truncate_to_cents(amount),
        pruned,
    }
}
