use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HabitError, Result};
use crate::habit::{Habit, Schedule};

/// Whether the habit's frequency rule selects `date`.
///
/// `date` is a UTC calendar day. Weekday and day-of-month are taken from it
/// directly. Misconfigured schedules (empty day sets, unknown frequencies)
/// are never due; this function does not fail.
pub fn is_due_on(habit: &Habit, date: NaiveDate) -> bool {
    schedule_selects(&habit.schedule, date)
}

pub fn schedule_selects(schedule: &Schedule, date: NaiveDate) -> bool {
    match schedule {
        Schedule::Daily => true,
        Schedule::Weekly(days) => days.contains(date.weekday()),
        Schedule::Monthly(days) => days.contains_day_of(date),
        Schedule::Custom {
            days_of_week,
            days_of_month,
        } => days_of_week.contains(date.weekday()) || days_of_month.contains_day_of(date),
        Schedule::Unrecognized(_) => false,
    }
}

/// Truncates an instant to its UTC calendar day.
pub fn utc_day(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

/// Parses `YYYY-MM-DD` or an ISO-8601 timestamp into a UTC calendar day.
/// Timestamps with an offset are converted to UTC first; timestamps without
/// one are read as UTC. Anything else, including impossible dates such as
/// `2024-02-30`, is rejected rather than clamped.
pub fn parse_utc_day(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(utc_day(instant.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.date());
    }
    Err(HabitError::InvalidInput(format!("`{trimmed}` is not a valid date")))
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(HabitError::InvalidInput(format!(
                "range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// The `len` days ending on `end`, oldest first.
    pub fn trailing(end: NaiveDate, len: u64) -> Result<Self> {
        let start = end
            .checked_sub_days(Days::new(len.saturating_sub(1)))
            .ok_or_else(|| HabitError::InvalidInput(format!("{len} days before {end}")))?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}
