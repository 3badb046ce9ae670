//! Recurrence specs (`1m`, `2w`, `1y`, `0.5m`) and their expansion into
//! concrete occurrence dates.

pub mod interval;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::ModelError;

pub use interval::{shift, shift_month, TimeUnit};

/// Upper bound on the occurrences produced by a single expansion.
pub const MAX_OCCURRENCES: usize = 100_000;

/// Half-open `[start, end)` range of dates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        if end > start {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RecurrenceSpec {
    pub every: f64,
    pub unit: TimeUnit,
}

impl RecurrenceSpec {
    pub fn monthly() -> Self {
        Self {
            every: 1.0,
            unit: TimeUnit::Month,
        }
    }

    /// Parses `N` followed by `w`, `m` or `y`. Weeks must be whole.
    pub fn parse(raw: &str, context: &str) -> Result<Self, ModelError> {
        let invalid = || ModelError::InvalidRecurrence {
            context: context.to_string(),
            value: raw.to_string(),
        };
        let trimmed = raw.trim();
        let suffix = trimmed.chars().last().ok_or_else(invalid)?;
        let unit = TimeUnit::from_suffix(suffix.to_ascii_lowercase())
            .filter(|unit| *unit != TimeUnit::Day)
            .ok_or_else(invalid)?;
        let every: f64 = trimmed[..trimmed.len() - suffix.len_utf8()]
            .trim()
            .parse()
            .map_err(|_| invalid())?;
        if !every.is_finite() || every <= 0.0 {
            return Err(invalid());
        }
        if unit == TimeUnit::Week && every.fract() != 0.0 {
            return Err(invalid());
        }
        Ok(Self { every, unit })
    }

    /// Date of the `index`-th occurrence counted from `start` (index 0 is
    /// `start`). `None` once the schedule runs off the calendar.
    pub fn nth(&self, start: NaiveDate, index: u32) -> Option<NaiveDate> {
        let steps = self.every * index as f64;
        match self.unit {
            TimeUnit::Day => add_days(start, steps),
            TimeUnit::Week => add_days(start, steps * 7.0),
            TimeUnit::Month => add_fractional_months(start, steps),
            TimeUnit::Year => add_fractional_months(start, steps * 12.0),
        }
    }

    pub fn label(&self) -> String {
        let count = format_count(self.every);
        match (count.as_str(), self.unit) {
            ("1", TimeUnit::Day) => "Daily".into(),
            ("1", TimeUnit::Week) => "Weekly".into(),
            ("1", TimeUnit::Month) => "Monthly".into(),
            ("1", TimeUnit::Year) => "Annually".into(),
            (count, unit) => {
                let noun = match unit {
                    TimeUnit::Day => "days",
                    TimeUnit::Week => "weeks",
                    TimeUnit::Month => "months",
                    TimeUnit::Year => "years",
                };
                format!("Every {} {}", count, noun)
            }
        }
    }
}

fn format_count(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Larger day counts than this leave the calendar `NaiveDate` supports.
const MAX_DAY_SHIFT: f64 = 1e9;

fn add_days(start: NaiveDate, days: f64) -> Option<NaiveDate> {
    let days = days.round();
    if days.abs() > MAX_DAY_SHIFT {
        return None;
    }
    start.checked_add_signed(Duration::days(days as i64))
}

fn add_fractional_months(start: NaiveDate, months: f64) -> Option<NaiveDate> {
    let whole = (months + 1e-9).floor();
    if whole > i32::MAX as f64 {
        return None;
    }
    let base = shift_month(start, whole as i32)?;
    let fraction = (months - whole).max(0.0);
    if fraction < 1e-9 {
        return Some(base);
    }
    let days = interval::days_in_month(base.year(), base.month()) as f64;
    add_days(base, fraction * days)
}

/// Occurrences of a schedule starting at `start`, before `stop` (exclusive)
/// and inside `window`. Without a spec there is exactly one occurrence.
pub fn occurrences(
    start: NaiveDate,
    stop: Option<NaiveDate>,
    spec: Option<&RecurrenceSpec>,
    window: DateWindow,
) -> Vec<NaiveDate> {
    let before_stop = |date: NaiveDate| stop.map_or(true, |stop| date < stop);
    let Some(spec) = spec else {
        return if before_stop(start) && window.contains(start) {
            vec![start]
        } else {
            Vec::new()
        };
    };

    let mut result = Vec::new();
    let mut truncated = false;
    for index in 0..=MAX_OCCURRENCES as u32 {
        let Some(date) = spec.nth(start, index) else {
            break;
        };
        if !before_stop(date) || date >= window.end {
            break;
        }
        if index as usize == MAX_OCCURRENCES {
            truncated = true;
            break;
        }
        if date >= window.start {
            result.push(date);
        }
    }
    if truncated {
        warn!(
            "recurrence `{}` from {} stopped after {} occurrences",
            spec.label(),
            start,
            MAX_OCCURRENCES
        );
    }
    result
}
