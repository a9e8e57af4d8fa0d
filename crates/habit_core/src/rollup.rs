use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use crate::completion::{fetch, LogSource};
use crate::error::{HabitError, Result};
use crate::habit::{Habit, HabitLog, UserId};
use crate::schedule::DateRange;

pub const WEEKLY_WINDOW_DAYS: u64 = 7;
pub const MONTHLY_WINDOW_MONTHS: i32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayPoint {
    pub date: NaiveDate,
    pub count: u32,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthPoint {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub completion_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySeries {
    pub time_range: DateRange,
    pub habit_target: u32,
    pub data: Vec<MonthPoint>,
}

/// Completed-log counts for the 7 days ending on `today`, oldest first.
/// Days without logs are filled with zero.
pub fn weekly_series<S: LogSource + ?Sized>(
    source: &S,
    habit: &Habit,
    user: &UserId,
    today: NaiveDate,
) -> Result<Vec<DayPoint>> {
    let window = DateRange::trailing(today, WEEKLY_WINDOW_DAYS)?;
    let logs = fetch(source, habit, user, window)?;

    let mut counts: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for log in owned_logs(&logs, habit, user, window).filter(|log| log.completed) {
        *counts.entry(log.date).or_default() += 1;
    }

    Ok(window
        .days()
        .map(|date| {
            let count = counts.get(&date).copied().unwrap_or(0);
            DayPoint {
                date,
                count,
                completed: count >= habit.required(),
            }
        })
        .collect())
}

/// Completion rate for each of the six calendar months before `today`'s
/// month, oldest first.
///
/// A month's rate is the share of its logged days (days with any log) that
/// have at least one completed log, rounded to a whole percent. Months with
/// no logged days report 0.
pub fn monthly_series<S: LogSource + ?Sized>(
    source: &S,
    habit: &Habit,
    user: &UserId,
    today: NaiveDate,
) -> Result<MonthlySeries> {
    let months: Vec<(i32, u32)> = (1..=MONTHLY_WINDOW_MONTHS)
        .rev()
        .map(|back| shift_month(today.year(), today.month(), -back))
        .collect();
    let (first_year, first_month) = months[0];
    let start = first_of_month(first_year, first_month)?;
    let end = first_of_month(today.year(), today.month())?
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| HabitError::InvalidInput(format!("no month precedes {today}")))?;
    let window = DateRange::new(start, end)?;

    let logs = fetch(source, habit, user, window)?;

    // Logged day -> whether any log that day was completed.
    let mut days: BTreeMap<NaiveDate, bool> = BTreeMap::new();
    for log in owned_logs(&logs, habit, user, window) {
        *days.entry(log.date).or_default() |= log.completed;
    }

    let data = months
        .into_iter()
        .map(|(year, month)| {
            let (logged, completed) = days
                .iter()
                .filter(|(date, _)| date.year() == year && date.month() == month)
                .fold((0u32, 0u32), |(logged, completed), (_, done)| {
                    (logged + 1, completed + u32::from(*done))
                });
            Ok(MonthPoint {
                year,
                month,
                month_name: first_of_month(year, month)?.format("%B").to_string(),
                completion_rate: percent(completed, logged),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(MonthlySeries {
        time_range: window,
        habit_target: habit.required(),
        data,
    })
}

fn owned_logs<'a>(
    logs: &'a [HabitLog],
    habit: &'a Habit,
    user: &'a UserId,
    window: DateRange,
) -> impl Iterator<Item = &'a HabitLog> {
    logs.iter().filter(move |log| {
        log.habit_id == habit.id && &log.user_id == user && window.contains(log.date)
    })
}

/// `round(100 * part / whole)` with halves rounded up; 0 when `whole` is 0.
fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (u64::from(part), u64::from(whole));
    ((200 * part + whole) / (2 * whole)) as u32
}

fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| HabitError::InvalidInput(format!("{year}-{month:02} is out of range")))
}
