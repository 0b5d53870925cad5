//! Totals and per-day series over a collection of movements.
//!
//! Both computations are pure: they never touch storage and never mutate the
//! input, so callers may recompute them on every state change.

use chrono::{Datelike, Local, TimeZone};
use log::debug;
use shared::{DailySeries, Movement, MovementDirection, MovementTotals};

use super::calendar::{days_in_month, local_date_of_millis};

/// Stateless service computing dashboard figures from movements
#[derive(Debug, Clone, Default)]
pub struct AggregationService;

impl AggregationService {
    pub fn new() -> Self {
        Self
    }

    /// Sum income and expense amounts; balance = income - expense
    pub fn totals(&self, movements: &[Movement]) -> MovementTotals {
        let (income, expense) = movements.iter().fold((0.0, 0.0), |(income, expense), m| {
            match m.direction {
                MovementDirection::Income => (income + m.amount, expense),
                MovementDirection::Expense => (income, expense + m.amount),
            }
        });

        MovementTotals {
            income,
            expense,
            balance: income - expense,
        }
    }

    /// Per-day income, expense and running balance for a month on the device calendar.
    ///
    /// `month0` is 0-based (0 = January), matching the 0-based day indexing of the
    /// returned vectors.
    pub fn daily_series(&self, movements: &[Movement], year: i32, month0: u32) -> DailySeries {
        self.daily_series_in(&Local, movements, year, month0)
    }

    /// Same as [`AggregationService::daily_series`] on the calendar of `tz`
    pub fn daily_series_in<Tz: TimeZone>(
        &self,
        tz: &Tz,
        movements: &[Movement],
        year: i32,
        month0: u32,
    ) -> DailySeries {
        let month = match month0.checked_add(1) {
            Some(month) => month,
            None => return DailySeries::empty(),
        };
        let days = days_in_month(year, month);
        if days == 0 {
            debug!("No days for {}/{} (0-based month), returning empty series", month0, year);
            return DailySeries::empty();
        }

        let mut income = vec![0.0; days as usize];
        let mut expense = vec![0.0; days as usize];

        for movement in movements {
            let Some(date) = local_date_of_millis(tz, movement.timestamp_millis) else {
                continue;
            };
            if date.year() != year || date.month() != month {
                continue;
            }

            let index = date.day0() as usize;
            match movement.direction {
                MovementDirection::Income => income[index] += movement.amount,
                MovementDirection::Expense => expense[index] += movement.amount,
            }
        }

        let mut balance = Vec::with_capacity(days as usize);
        let mut running = 0.0;
        for (day_income, day_expense) in income.iter().zip(&expense) {
            running += day_income - day_expense;
            balance.push(running);
        }

        DailySeries {
            days,
            income,
            expense,
            balance,
        }
    }
}
