use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeUnit {
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    pub fn from_suffix(suffix: char) -> Option<TimeUnit> {
        match suffix {
            'd' => Some(TimeUnit::Day),
            'w' => Some(TimeUnit::Week),
            'm' => Some(TimeUnit::Month),
            'y' => Some(TimeUnit::Year),
            _ => None,
        }
    }

    pub fn suffix(self) -> char {
        match self {
            TimeUnit::Day => 'd',
            TimeUnit::Week => 'w',
            TimeUnit::Month => 'm',
            TimeUnit::Year => 'y',
        }
    }
}

/// Moves `date` by a whole number of units. Month and year shifts clamp the
/// day to the length of the target month. `None` when the result falls
/// outside the representable calendar.
pub fn shift(date: NaiveDate, steps: i32, unit: TimeUnit) -> Option<NaiveDate> {
    match unit {
        TimeUnit::Day => date.checked_add_signed(Duration::days(steps as i64)),
        TimeUnit::Week => date.checked_add_signed(Duration::weeks(steps as i64)),
        TimeUnit::Month => shift_month(date, steps),
        TimeUnit::Year => shift_year(date, steps),
    }
}

pub fn shift_month(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let index = (date.year() * 12 + date.month0() as i32).checked_add(months)?;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn shift_year(date: NaiveDate, years: i32) -> Option<NaiveDate> {
    let months = years.checked_mul(12)?;
    shift_month(date, months)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .map(|first_next| (first_next - Duration::days(1)).day())
        .unwrap_or(28)
}
