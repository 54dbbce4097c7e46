//! Budget state survives restarts of the file-backed store.

#![cfg(feature = "persistent")]

use std::fs;
use std::sync::Arc;

use chrono::NaiveDate;
use pocketmoney::storage::{open_store, PersistentConfig};
use pocketmoney::{BudgetEngine, EngineConfig, FixedClock, SettlementAction, StorageError};
use rust_decimal_macros::dec;
use tempfile::tempdir;

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::at_noon(NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()).unwrap())
}

fn open_engine(dir: &std::path::Path) -> BudgetEngine {
    let store = open_store(dir, Some(PersistentConfig { sync_on_write: false })).unwrap();
    BudgetEngine::new(Arc::new(store), clock(), EngineConfig::default()).unwrap()
}

#[test]
fn settlement_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let engine = open_engine(dir.path());
        engine.initialize_month(dec!(3000), dec!(1)).unwrap();
        engine
            .settle_day(dec!(60), SettlementAction::Save, dec!(40))
            .unwrap();
    }

    let engine = open_engine(dir.path());
    let snapshot = engine.snapshot().unwrap();
    assert_eq!(snapshot.total_remaining, dec!(2940));
    assert_eq!(snapshot.savings_pot, dec!(40));
    assert_eq!(snapshot.daily_budget, dec!(100));
    assert_eq!(engine.history().unwrap().len(), 1);
}

#[test]
fn second_process_is_locked_out() {
    let dir = tempdir().unwrap();
    let _engine = open_engine(dir.path());

    let err = open_store(dir.path(), None).unwrap_err();
    assert!(matches!(
        err,
        pocketmoney::BudgetError::Storage(StorageError::Locked(_))
    ));
    assert!(err.is_retryable());
}

#[test]
fn truncated_state_file_is_reported_not_replaced() {
    let dir = tempdir().unwrap();
    {
        let engine = open_engine(dir.path());
        engine.initialize_month(dec!(3000), dec!(1)).unwrap();
    }

    let path = dir.path().join("pm_state.doc");
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    let engine = open_engine(dir.path());
    let err = engine.snapshot().unwrap_err();
    assert!(err.is_storage());
    // The damaged file is left for inspection.
    assert!(path.exists());
}
