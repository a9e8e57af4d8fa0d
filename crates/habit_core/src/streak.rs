use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::completion::{fetch, LogSource};
use crate::error::{HabitError, Result};
use crate::habit::{Habit, UserId};
use crate::schedule::{is_due_on, DateRange};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub current: u32,
    pub longest: u32,
    pub last_completed: Option<NaiveDate>,
}

/// Consecutive satisfied due days within the `lookback_days` ending on `today`.
///
/// Days the habit is not due on are skipped. A missed due day resets the run,
/// except `today`, which is still open.
pub fn streak<S: LogSource + ?Sized>(
    source: &S,
    habit: &Habit,
    user: &UserId,
    today: NaiveDate,
    lookback_days: u32,
) -> Result<Streak> {
    if lookback_days == 0 {
        return Err(HabitError::InvalidInput(
            "streak lookback must be at least one day".into(),
        ));
    }
    let window = DateRange::trailing(today, u64::from(lookback_days))?;
    let logs = fetch(source, habit, user, window)?;

    let mut completed: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for log in logs
        .iter()
        .filter(|log| log.completed && log.habit_id == habit.id && &log.user_id == user)
    {
        *completed.entry(log.date).or_default() += 1;
    }

    let mut result = Streak::default();
    let mut run = 0u32;
    for date in window.days().filter(|date| is_due_on(habit, *date)) {
        let count = completed.get(&date).copied().unwrap_or(0);
        if count >= habit.required() {
            run += 1;
            result.longest = result.longest.max(run);
            result.last_completed = Some(date);
        } else if date != today {
            run = 0;
        }
    }
    result.current = run;
    Ok(result)
}
