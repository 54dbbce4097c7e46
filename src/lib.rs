//! # pocketmoney - Daily pocket-money budgeting engine
//!
//! pocketmoney turns a finite monthly allowance into a daily spending limit,
//! weights weekend days, subtracts time-bounded deductions, and settles each
//! day's actual spending back into durable running totals.
//!
//! ## Core Concepts
//!
//! - **Settings**: allowance, weekend multiplier and currency, fixed for the month
//! - **State**: remaining funds, savings pot, settlement history and deductions
//! - **Daily budget**: allowance normalized over the weighted days of the month,
//!   capped at the uncommitted funds and truncated to cents
//! - **Settlement**: the end-of-day transition recording spend and the chosen action
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use rust_decimal::Decimal;
//! use pocketmoney::{
//!     BudgetEngine, EngineConfig, FixedClock, InMemoryDocumentStore, SettlementAction,
//! };
//!
//! let clock = FixedClock::at_noon(NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()).unwrap();
//! let engine = BudgetEngine::new(
//!     Arc::new(InMemoryDocumentStore::new()),
//!     Arc::new(clock),
//!     EngineConfig::default(),
//! )?;
//!
//! engine.initialize_month(Decimal::from(3000), Decimal::ONE)?;
//! assert_eq!(engine.compute_daily_budget()?, Decimal::from(100));
//!
//! engine.settle_day(Decimal::from(70), SettlementAction::Save, Decimal::from(30))?;
//! let snapshot = engine.snapshot()?;
//! assert_eq!(snapshot.total_remaining, Decimal::from(2930));
//! assert_eq!(snapshot.savings_pot, Decimal::from(30));
//! # Ok::<(), pocketmoney::BudgetError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod calendar;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod migration;
pub mod money;
pub mod settings;
pub mod state;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{EngineConfig, RateNormalization};
pub use engine::{BudgetEngine, BudgetSnapshot, DailyBudget, Settlement};
pub use error::{BudgetError, BudgetResult, ExecutionError, ValidationError};
pub use settings::Settings;
pub use state::{BudgetState, DayOutcome, HistoryEntry, SettlementAction, TemporaryDeduction};
pub use storage::{DocumentStore, InMemoryDocumentStore, StorageError};
