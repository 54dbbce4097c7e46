//! Month calendar arithmetic.
//!
//! Converts a calendar position into the weighted day counts used to turn a
//! lump monthly allowance into a per-day rate.

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;

/// Returns true for Saturday and Sunday.
#[must_use]
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Day classification for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCalendar {
    first: NaiveDate,
    days: u32,
}

impl MonthCalendar {
    /// Calendar of the month containing `date`.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        // Every NaiveDate has a valid first-of-month, so with_day(1) cannot fail here.
        let first = date.with_day(1).unwrap_or(date);
        let next_first = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        };
        let days = next_first.map_or(31, |next| {
            u32::try_from(next.signed_duration_since(first).num_days()).unwrap_or(31)
        });
        Self { first, days }
    }

    /// Iterates the days of the month starting at day-of-month `from_day` (1-based).
    pub fn days_from(&self, from_day: u32) -> impl Iterator<Item = NaiveDate> + '_ {
        let start = from_day.max(1);
        (start..=self.days).filter_map(move |d| self.first.with_day(d))
    }

    /// Weekday/weekend split of the whole month.
    #[must_use]
    pub fn split(&self) -> DaySplit {
        DaySplit::count(self.days_from(1))
    }

    /// Weekday/weekend split from `date` (inclusive) to the end of its month.
    #[must_use]
    pub fn split_remaining(&self, date: NaiveDate) -> DaySplit {
        DaySplit::count(self.days_from(date.day()))
    }
}

/// Count of weekdays and weekend days in a span of days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaySplit {
    /// Monday through Friday.
    pub weekdays: u32,
    /// Saturday and Sunday.
    pub weekend_days: u32,
}

impl DaySplit {
    fn count(days: impl Iterator<Item = NaiveDate>) -> Self {
        days.fold(Self::default(), |mut acc, day| {
            if is_weekend(day) {
                acc.weekend_days += 1;
            } else {
                acc.weekdays += 1;
            }
            acc
        })
    }

    /// `weekdays + weekend_days * weekend_multiplier`, or `None` if that leaves
    /// the decimal range.
    #[must_use]
    pub fn weighted(&self, weekend_multiplier: Decimal) -> Option<Decimal> {
        Decimal::from(self.weekend_days)
            .checked_mul(weekend_multiplier)?
            .checked_add(Decimal::from(self.weekdays))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn days(split: DaySplit) -> u32 {
        split.weekdays + split.weekend_days
    }

    #[test]
    fn test_month_lengths() {
        assert_eq!(days(MonthCalendar::containing(date(2024, 2, 10)).split()), 29);
        assert_eq!(days(MonthCalendar::containing(date(2023, 2, 10)).split()), 28);
        assert_eq!(days(MonthCalendar::containing(date(2024, 6, 30)).split()), 30);
        assert_eq!(days(MonthCalendar::containing(date(2024, 12, 31)).split()), 31);
    }

    #[test]
    fn test_july_2024_has_eight_weekend_days() {
        let split = MonthCalendar::containing(date(2024, 7, 15)).split();
        assert_eq!(split.weekend_days, 8);
        assert_eq!(split.weekdays, 23);
        assert_eq!(split.weighted(dec!(2)), Some(dec!(39)));
    }

    #[test]
    fn test_split_remaining_includes_today() {
        let cal = MonthCalendar::containing(date(2024, 7, 29));
        // Mon 29, Tue 30, Wed 31
        let split = cal.split_remaining(date(2024, 7, 29));
        assert_eq!(days(split), 3);
        assert_eq!(split.weekend_days, 0);

        let split = cal.split_remaining(date(2024, 7, 27));
        assert_eq!(days(split), 5);
        assert_eq!(split.weekend_days, 2);
    }

    #[test]
    fn test_weighted_with_zero_multiplier() {
        let split = MonthCalendar::containing(date(2024, 7, 1)).split();
        assert_eq!(split.weighted(Decimal::ZERO), Some(dec!(23)));
    }

    #[test]
    fn test_weighted_overflow_is_none() {
        let split = MonthCalendar::containing(date(2024, 7, 1)).split();
        assert_eq!(split.weighted(Decimal::MAX / dec!(4)), None);
        let large = split.weighted(Decimal::MAX / dec!(100));
        assert!(large.is_some_and(|w| w > Decimal::ZERO));
    }

    #[test]
    fn test_is_weekend() {
        assert!(is_weekend(date(2024, 7, 6)));
        assert!(is_weekend(date(2024, 7, 7)));
        assert!(!is_weekend(date(2024, 7, 8)));
    }
}
