//! Calendar arithmetic for month-based views.
//!
//! Every movement is bucketed by the calendar date it falls on in a given time
//! zone (the device's local zone in production). The helpers here convert
//! between epoch milliseconds and calendar months, and answer the usual
//! questions about a month: how many days it has, which one precedes it, and
//! which millisecond range it covers.

use chrono::{Datelike, NaiveDate, TimeZone};
use std::fmt;

/// A calendar month. `month` is 1-based (1 = January).
///
/// Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Create a month, rejecting month numbers outside 1..=12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month containing `millis` when read on the calendar of `tz`
    pub fn containing_millis_in<Tz: TimeZone>(tz: &Tz, millis: i64) -> Option<Self> {
        local_date_of_millis(tz, millis).map(Self::from_date)
    }

    /// Navigate to the previous month
    pub fn previous(&self) -> Self {
        self.months_back(1)
    }

    /// Navigate to the next month
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// The month `n` months before this one
    pub fn months_back(&self, n: u32) -> Self {
        let index = self.year as i64 * 12 + (self.month as i64 - 1) - n as i64;
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// Number of days in this month
    pub fn days(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Inclusive epoch-millisecond bounds of this month on the calendar of `tz`:
    /// `[start of month, start of next month - 1]`
    pub fn range_millis_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<(i64, i64)> {
        let start = local_midnight_millis(tz, self.first_day()?)?;
        let next_start = local_midnight_millis(tz, self.next().first_day()?)?;
        Some((start, next_start - 1))
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Check if a year is a leap year
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Get the number of days in a given month (1-based) and year.
/// Returns 0 for a month number outside 1..=12.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        4 | 6 | 9 | 11 => 30,
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        _ => 0,
    }
}

/// Get the human-readable name for a month number
pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Invalid Month",
    }
}

/// Epoch milliseconds of the first instant of `date` on the calendar of `tz`.
///
/// Zones that skip midnight on a DST change start the day at the first hour
/// that exists.
pub fn local_midnight_millis<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<i64> {
    (0..24)
        .find_map(|hour| {
            let naive = date.and_hms_opt(hour, 0, 0)?;
            tz.from_local_datetime(&naive).earliest()
        })
        .map(|dt| dt.timestamp_millis())
}

/// Calendar date of an instant on the calendar of `tz`
pub fn local_date_of_millis<Tz: TimeZone>(tz: &Tz, millis: i64) -> Option<NaiveDate> {
    tz.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.date_naive())
}
