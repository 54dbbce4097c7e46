//! Time source for the engine.
//!
//! The engine never reads the system clock directly; it asks an injected
//! [`Clock`] so date-dependent behavior can be pinned in tests.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};

/// Supplies "now" with the user's UTC offset.
///
/// The offset matters: weekend classification and month boundaries follow the
/// local calendar day, while deduction expiry compares absolute instants.
pub trait Clock: Send + Sync {
    /// Current instant in the user's local offset.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Current local calendar day.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Current instant in UTC.
    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }
}

/// Wall clock in the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: DateTime<FixedOffset>,
}

impl FixedClock {
    /// Clock that always reports `at`.
    #[must_use]
    pub const fn new(at: DateTime<FixedOffset>) -> Self {
        Self { at }
    }

    /// Clock at noon UTC on `date`.
    #[must_use]
    pub fn at_noon(date: NaiveDate) -> Option<Self> {
        let naive = date.and_hms_opt(12, 0, 0)?;
        Some(Self::new(naive.and_utc().fixed_offset()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.at
    }
}
