//! Budget engine.
//!
//! [`BudgetEngine`] is a synchronous executor over an injected
//! [`DocumentStore`]. It keeps no budget data between calls: every operation
//! loads the settings and state documents, works on them, and writes back what
//! changed. Each read-modify-write runs under one engine-wide mutex, so callers
//! sharing an engine across threads cannot lose updates and a snapshot never
//! observes a half-applied settlement.

mod daily;
mod settlement;

pub use daily::{compute_daily_budget, DailyBudget};
pub use settlement::apply_settlement;

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{BudgetError, BudgetResult, ExecutionError, ValidationError};
use crate::migration::{migrate_settings, migrate_state};
use crate::money::ensure_non_negative;
use crate::settings::Settings;
use crate::state::{BudgetState, DayOutcome, HistoryEntry, SettlementAction, TemporaryDeduction};
use crate::storage::DocumentStore;

/// Store key of the settings document.
pub const SETTINGS_KEY: &str = "pm_settings";
/// Store key of the state document.
pub const STATE_KEY: &str = "pm_state";
/// Store key under which earlier versions kept history separately.
pub const LEGACY_HISTORY_KEY: &str = "pm_history";

/// Read-only view handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSnapshot {
    /// Today's spending limit.
    pub daily_budget: Decimal,
    /// Funds not yet spent.
    pub total_remaining: Decimal,
    /// Funds set aside.
    pub savings_pot: Decimal,
    /// Display prefix.
    pub currency: String,
    /// Whether today is a weekend day.
    pub is_weekend: bool,
    /// Sum of deductions active today.
    pub active_deductions: Decimal,
    /// Whether a settlement already exists for today.
    pub settled_today: bool,
}

/// Outcome of [`BudgetEngine::settle_spend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// Budget the spend was compared against.
    pub daily_budget: Decimal,
    /// Surplus or deficit derived from the spend.
    pub outcome: DayOutcome,
    /// Entry appended to the history.
    pub entry: HistoryEntry,
}

/// Daily budget engine.
#[derive(Clone)]
pub struct BudgetEngine {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    txn: Arc<Mutex<()>>,
}

impl std::fmt::Debug for BudgetEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BudgetEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BudgetEngine {
    /// Create an engine over `store`, reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Fails if `config` does not validate.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> BudgetResult<Self> {
        Ok(Self {
            store,
            clock,
            config: config.validate()?,
            txn: Arc::new(Mutex::new(())),
        })
    }

    /// Access the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    fn lock(&self) -> BudgetResult<MutexGuard<'_, ()>> {
        self.txn
            .lock()
            .map_err(|_| BudgetError::internal("engine transaction lock poisoned"))
    }

    fn corrupt(key: &str, e: &serde_json::Error) -> BudgetError {
        ExecutionError::CorruptDocument {
            key: key.to_string(),
            message: e.to_string(),
        }
        .into()
    }

    fn load_settings(&self) -> BudgetResult<Option<Settings>> {
        let Some(mut doc) = self.store.get(SETTINGS_KEY)? else {
            return Ok(None);
        };
        let migrated = migrate_settings(&mut doc, &self.config.default_currency);
        let settings: Settings =
            serde_json::from_value(doc).map_err(|e| Self::corrupt(SETTINGS_KEY, &e))?;
        if migrated {
            warn!(key = SETTINGS_KEY, "upgraded settings document");
            self.save_settings(&settings)?;
        }
        Ok(Some(settings))
    }

    fn load_state(&self, now: DateTime<Utc>) -> BudgetResult<Option<BudgetState>> {
        let Some(mut doc) = self.store.get(STATE_KEY)? else {
            return Ok(None);
        };
        let legacy = self.store.get(LEGACY_HISTORY_KEY)?;
        let had_legacy = legacy.is_some();
        let migrated = migrate_state(&mut doc, legacy, now);
        let mut state: BudgetState =
            serde_json::from_value(doc).map_err(|e| Self::corrupt(STATE_KEY, &e))?;
        if migrated {
            warn!(key = STATE_KEY, "upgraded state document");
            self.save_state(&mut state, now)?;
        }
        if had_legacy {
            self.store.remove(LEGACY_HISTORY_KEY)?;
        }
        Ok(Some(state))
    }

    fn save_settings(&self, settings: &Settings) -> BudgetResult<()> {
        let doc = serde_json::to_value(settings).map_err(|e| Self::corrupt(SETTINGS_KEY, &e))?;
        self.store.set(SETTINGS_KEY, doc)?;
        Ok(())
    }

    fn save_state(&self, state: &mut BudgetState, now: DateTime<Utc>) -> BudgetResult<()> {
        state.last_updated = now;
        let doc: Value = serde_json::to_value(&*state).map_err(|e| Self::corrupt(STATE_KEY, &e))?;
        self.store.set(STATE_KEY, doc)?;
        Ok(())
    }

    /// Loads both documents and computes today's figure. Caller holds the lock.
    fn daily_locked(
        &self,
        now: DateTime<FixedOffset>,
    ) -> BudgetResult<Option<(Settings, BudgetState, DailyBudget)>> {
        let now_utc = now.with_timezone(&Utc);
        let Some(settings) = self.load_settings()? else {
            return Ok(None);
        };
        let Some(mut state) = self.load_state(now_utc)? else {
            return Ok(None);
        };

        let daily = compute_daily_budget(&settings, &mut state, now, self.config.normalization);
        if daily.pruned > 0 {
            info!(pruned = daily.pruned, "expired temporary deductions removed");
            self.save_state(&mut state, now_utc)?;
        }
        debug!(
            amount = %daily.amount,
            base_rate = %daily.base_rate,
            weighted_days = %daily.weighted_days,
            deductions = %daily.deductions,
            is_weekend = daily.is_weekend,
            "daily budget computed"
        );
        Ok(Some((settings, state, daily)))
    }

    /// True once month initialization has written both documents.
    pub fn is_onboarded(&self) -> BudgetResult<bool> {
        let _guard = self.lock()?;
        Ok(self.store.get(SETTINGS_KEY)?.is_some() && self.store.get(STATE_KEY)?.is_some())
    }

    /// Today's spending limit.
    ///
    /// Returns zero when the budget has not been initialized. Expired
    /// deductions are pruned and the state persisted even if the caller
    /// discards the figure.
    pub fn compute_daily_budget(&self) -> BudgetResult<Decimal> {
        Ok(self
            .daily_breakdown()?
            .map_or(Decimal::ZERO, |daily| daily.amount))
    }

    /// Today's figure with every intermediate value, or `None` before initialization.
    pub fn daily_breakdown(&self) -> BudgetResult<Option<DailyBudget>> {
        let _guard = self.lock()?;
        let now = self.clock.now();
        Ok(self.daily_locked(now)?.map(|(_, _, daily)| daily))
    }

    /// Snapshot for display.
    ///
    /// # Errors
    ///
    /// `ExecutionError::NotOnboarded` if settings or state are missing.
    pub fn snapshot(&self) -> BudgetResult<BudgetSnapshot> {
        let _guard = self.lock()?;
        let now = self.clock.now();
        let (settings, state, daily) = self
            .daily_locked(now)?
            .ok_or(ExecutionError::NotOnboarded)?;

        Ok(BudgetSnapshot {
            daily_budget: daily.amount,
            total_remaining: state.total_remaining,
            savings_pot: state.savings_pot,
            currency: settings.currency,
            is_weekend: daily.is_weekend,
            active_deductions: daily.deductions,
            settled_today: state.settled_on(now.date_naive(), now.offset()),
        })
    }

    /// Records the day's spend and chosen action.
    ///
    /// `amount` is the unsigned surplus or deficit the action was chosen for.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for negative `spent` or `amount`
    /// - `ExecutionError::NotOnboarded` if no state exists
    /// - `ExecutionError::AlreadySettled` when one settlement per day is enforced
    pub fn settle_day(
        &self,
        spent: Decimal,
        action: SettlementAction,
        amount: Decimal,
    ) -> BudgetResult<HistoryEntry> {
        let _guard = self.lock()?;
        let now = self.clock.now();
        let now_utc = now.with_timezone(&Utc);

        let mut state = self
            .load_state(now_utc)?
            .ok_or(ExecutionError::NotOnboarded)?;
        self.settle_locked(&mut state, now, spent, action, amount)
    }

    fn settle_locked(
        &self,
        state: &mut BudgetState,
        now: DateTime<FixedOffset>,
        spent: Decimal,
        action: SettlementAction,
        amount: Decimal,
    ) -> BudgetResult<HistoryEntry> {
        let today = now.date_naive();
        if self.config.one_settlement_per_day && state.settled_on(today, now.offset()) {
            return Err(ExecutionError::AlreadySettled { date: today }.into());
        }

        let now_utc = now.with_timezone(&Utc);
        let entry = apply_settlement(state, spent, action, amount, now_utc)?;
        self.save_state(state, now_utc)?;

        info!(
            spent = %entry.spent,
            action = %entry.action,
            diff = %entry.diff,
            total_remaining = %state.total_remaining,
            savings_pot = %state.savings_pot,
            "day settled"
        );
        Ok(entry)
    }

    /// Compares `spent` with today's budget and settles with the matching amount.
    ///
    /// # Errors
    ///
    /// As [`Self::settle_day`], plus `ValidationError::ActionMismatch` when
    /// `action` does not belong to the day's outcome (e.g. `Save` on a deficit).
    pub fn settle_spend(
        &self,
        spent: Decimal,
        action: SettlementAction,
    ) -> BudgetResult<Settlement> {
        let spent = ensure_non_negative("spent", spent)?;
        let _guard = self.lock()?;
        let now = self.clock.now();

        let (_, mut state, daily) = self
            .daily_locked(now)?
            .ok_or(ExecutionError::NotOnboarded)?;

        let outcome = DayOutcome::from_spend(daily.amount, spent);
        if !outcome.permits(action) {
            return Err(ValidationError::ActionMismatch {
                action: action.to_string(),
                outcome: outcome.kind(),
            }
            .into());
        }

        let entry = self.settle_locked(&mut state, now, spent, action, outcome.amount())?;
        Ok(Settlement {
            daily_budget: daily.amount,
            outcome,
            entry,
        })
    }

    /// Starts a new period with the configured default currency.
    ///
    /// Destroys any existing settings, history and deductions.
    ///
    /// # Errors
    ///
    /// Rejects an allowance `<= 0` or a multiplier `< 0`.
    pub fn initialize_month(
        &self,
        monthly_allowance: Decimal,
        weekend_multiplier: Decimal,
    ) -> BudgetResult<()> {
        let currency = self.config.default_currency.clone();
        self.initialize_month_with_currency(monthly_allowance, weekend_multiplier, currency)
    }

    /// Starts a new period with an explicit currency prefix.
    ///
    /// # Errors
    ///
    /// Rejects an allowance `<= 0`, a multiplier `< 0` or a blank currency.
    pub fn initialize_month_with_currency(
        &self,
        monthly_allowance: Decimal,
        weekend_multiplier: Decimal,
        currency: impl Into<String>,
    ) -> BudgetResult<()> {
        let settings = Settings::new(monthly_allowance, weekend_multiplier, currency)?;
        let _guard = self.lock()?;
        let now = self.clock.now_utc();

        let mut state = BudgetState::fresh(settings.monthly_allowance, now);
        self.save_state(&mut state, now)?;
        self.save_settings(&settings)?;
        self.store.remove(LEGACY_HISTORY_KEY)?;

        info!(
            monthly_allowance = %settings.monthly_allowance,
            weekend_multiplier = %settings.weekend_multiplier,
            currency = %settings.currency,
            "month initialized"
        );
        Ok(())
    }

    /// Adds a deduction of `daily_amount` per day until `end_date`.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a negative amount or an `end_date` not after now
    /// - `ExecutionError::NotOnboarded` if no state exists
    pub fn add_temporary_deduction(
        &self,
        daily_amount: Decimal,
        end_date: DateTime<Utc>,
    ) -> BudgetResult<TemporaryDeduction> {
        let daily_amount = ensure_non_negative("daily_amount", daily_amount)?;
        let _guard = self.lock()?;
        let now = self.clock.now_utc();
        if end_date <= now {
            return Err(ValidationError::EndDateInPast { end_date, now }.into());
        }

        let mut state = self
            .load_state(now)?
            .ok_or(ExecutionError::NotOnboarded)?;
        let deduction = TemporaryDeduction {
            daily_amount,
            end_date,
        };
        state.temporary_deductions.push(deduction.clone());
        self.save_state(&mut state, now)?;

        info!(daily_amount = %daily_amount, end_date = %end_date, "temporary deduction added");
        Ok(deduction)
    }

    /// Settled days, oldest first. Empty before initialization.
    pub fn history(&self) -> BudgetResult<Vec<HistoryEntry>> {
        let _guard = self.lock()?;
        let now = self.clock.now_utc();
        Ok(self
            .load_state(now)?
            .map(|state| state.daily_history)
            .unwrap_or_default())
    }

    /// Current settings, if initialized.
    pub fn settings(&self) -> BudgetResult<Option<Settings>> {
        let _guard = self.lock()?;
        self.load_settings()
    }

    /// Current state without computing the daily figure, if initialized.
    pub fn state(&self) -> BudgetResult<Option<BudgetState>> {
        let _guard = self.lock()?;
        self.load_state(self.clock.now_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use rust_decimal_macros::dec;
    use serde_json::json;

    use crate::clock::FixedClock;
    use crate::storage::InMemoryDocumentStore;

    fn engine_at(
        date: NaiveDate,
        config: EngineConfig,
    ) -> (BudgetEngine, Arc<InMemoryDocumentStore>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let clock = Arc::new(FixedClock::at_noon(date).unwrap());
        let engine = BudgetEngine::new(store.clone(), clock, config).unwrap();
        (engine, store)
    }

    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 10).unwrap()
    }

    #[test]
    fn test_not_onboarded_behaviour() {
        let (engine, _) = engine_at(wednesday(), EngineConfig::default());
        assert!(!engine.is_onboarded().unwrap());
        assert_eq!(engine.compute_daily_budget().unwrap(), Decimal::ZERO);
        assert!(engine.snapshot().unwrap_err().is_not_onboarded());
        assert!(engine
            .settle_day(dec!(1), SettlementAction::Spread, dec!(0))
            .unwrap_err()
            .is_not_onboarded());
        assert!(engine.history().unwrap().is_empty());
    }

    #[test]
    fn test_initialize_rejects_bad_input() {
        let (engine, store) = engine_at(wednesday(), EngineConfig::default());
        assert!(engine.initialize_month(dec!(0), dec!(1)).unwrap_err().is_validation());
        assert!(engine.initialize_month(dec!(100), dec!(-1)).unwrap_err().is_validation());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_initialize_is_destructive() {
        let (engine, _) = engine_at(wednesday(), EngineConfig::default());
        engine.initialize_month(dec!(1000), dec!(1)).unwrap();
        engine.settle_day(dec!(50), SettlementAction::Save, dec!(30)).unwrap();

        engine.initialize_month(dec!(800), dec!(2)).unwrap();
        let state = engine.state().unwrap().unwrap();
        assert_eq!(state.total_remaining, dec!(800));
        assert_eq!(state.savings_pot, Decimal::ZERO);
        assert!(state.daily_history.is_empty());
        assert_eq!(engine.settings().unwrap().unwrap().weekend_multiplier, dec!(2));
    }

    #[test]
    fn test_pruning_is_persisted() {
        let (engine, store) = engine_at(wednesday(), EngineConfig::default());
        engine.initialize_month(dec!(3100), dec!(1)).unwrap();

        let mut doc = store.get(STATE_KEY).unwrap().unwrap();
        doc["temporaryDeductions"] = json!([
            { "dailyAmount": 5, "endDate": 0 },
            { "dailyAmount": 7, "endDate": 4_102_444_800_000_i64 }
        ]);
        store.set(STATE_KEY, doc).unwrap();

        assert_eq!(engine.compute_daily_budget().unwrap(), dec!(93));
        let persisted = store.get(STATE_KEY).unwrap().unwrap();
        assert_eq!(persisted["temporaryDeductions"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_settle_spend_matches_outcome() {
        let (engine, _) = engine_at(wednesday(), EngineConfig::default());
        engine.initialize_month(dec!(3100), dec!(1)).unwrap();

        let err = engine.settle_spend(dec!(40), SettlementAction::FixWeek).unwrap_err();
        assert!(err.is_validation());

        let settlement = engine.settle_spend(dec!(40), SettlementAction::Save).unwrap();
        assert_eq!(settlement.daily_budget, dec!(100));
        assert_eq!(settlement.outcome, DayOutcome::Surplus(dec!(60)));
        assert_eq!(settlement.entry.diff, dec!(60));

        let snapshot = engine.snapshot().unwrap();
        assert_eq!(snapshot.total_remaining, dec!(3060));
        assert_eq!(snapshot.savings_pot, dec!(60));
        assert!(snapshot.settled_today);
    }

    #[test]
    fn test_one_settlement_per_day() {
        let config = EngineConfig::default().with_one_settlement_per_day(true);
        let (engine, _) = engine_at(wednesday(), config);
        engine.initialize_month(dec!(1000), dec!(1)).unwrap();
        engine.settle_day(dec!(10), SettlementAction::Spread, dec!(5)).unwrap();

        let err = engine
            .settle_day(dec!(10), SettlementAction::Spread, dec!(5))
            .unwrap_err();
        assert!(matches!(
            err,
            BudgetError::Execution(ExecutionError::AlreadySettled { .. })
        ));
        assert_eq!(engine.history().unwrap().len(), 1);
    }

    #[test]
    fn test_add_temporary_deduction() {
        let (engine, _) = engine_at(wednesday(), EngineConfig::default());
        engine.initialize_month(dec!(3100), dec!(1)).unwrap();

        let now = FixedClock::at_noon(wednesday()).unwrap().now_utc();
        let err = engine
            .add_temporary_deduction(dec!(10), now - Duration::hours(1))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(engine
            .add_temporary_deduction(dec!(-2), now + Duration::days(1))
            .unwrap_err()
            .is_validation());

        engine
            .add_temporary_deduction(dec!(12.34), now + Duration::days(7))
            .unwrap();
        assert_eq!(engine.compute_daily_budget().unwrap(), dec!(87.66));
        assert_eq!(engine.snapshot().unwrap().active_deductions, dec!(12.34));
    }

    #[test]
    fn test_legacy_documents_are_migrated_once() {
        let (engine, store) = engine_at(wednesday(), EngineConfig::default().with_currency("€"));
        store
            .set(SETTINGS_KEY, json!({ "monthlyAllowance": 3100, "weekendMultiplier": 1 }))
            .unwrap();
        store.set(STATE_KEY, json!({ "totalRemaining": 3000 })).unwrap();
        store
            .set(
                LEGACY_HISTORY_KEY,
                json!([{
                    "date": "2024-07-09T20:00:00Z",
                    "spent": 110,
                    "action": "week",
                    "diff": 10
                }]),
            )
            .unwrap();

        let snapshot = engine.snapshot().unwrap();
        assert_eq!(snapshot.currency, "€");
        assert_eq!(snapshot.savings_pot, Decimal::ZERO);

        let history = engine.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].diff, dec!(-10));
        assert!(store.get(LEGACY_HISTORY_KEY).unwrap().is_none());

        let stored = store.get(STATE_KEY).unwrap().unwrap();
        assert!(stored["dailyHistory"].is_array());
        assert_eq!(store.get(SETTINGS_KEY).unwrap().unwrap()["currency"], "€");
    }

    #[test]
    fn test_corrupt_state_is_reported() {
        let (engine, store) = engine_at(wednesday(), EngineConfig::default());
        engine.initialize_month(dec!(100), dec!(1)).unwrap();
        store.set(STATE_KEY, json!({ "totalRemaining": "lots" })).unwrap();

        let err = engine.snapshot().unwrap_err();
        assert!(matches!(
            err,
            BudgetError::Execution(ExecutionError::CorruptDocument { .. })
        ));
    }
}
