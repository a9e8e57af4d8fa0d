use chrono::NaiveDate;
use serde::Serialize;

use crate::completion::{count_completed, fetch, LogSource};
use crate::error::Result;
use crate::habit::{Habit, UserId};
use crate::schedule::{is_due_on, DateRange};

/// A user's active habits split by their state on one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPartition {
    /// Due and not yet satisfied.
    pub due: Vec<Habit>,
    pub done_today: Vec<Habit>,
    pub not_due: Vec<Habit>,
}

impl DailyPartition {
    /// The "today" list: habits still waiting for completions.
    pub fn pending_view(&self) -> &[Habit] {
        &self.due
    }

    /// Everything else: done today first, then habits not due today.
    pub fn dashboard_view(&self) -> Vec<&Habit> {
        self.done_today.iter().chain(self.not_due.iter()).collect()
    }

    pub fn len(&self) -> usize {
        self.due.len() + self.done_today.len() + self.not_due.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classifies each of the user's non-archived habits for `today`. Archived
/// habits and habits owned by someone else are dropped. Input order is kept
/// within each bucket. Logs are only fetched for habits that are due.
pub fn partition_for_today<S: LogSource + ?Sized>(
    source: &S,
    habits: &[Habit],
    user: &UserId,
    today: NaiveDate,
) -> Result<DailyPartition> {
    let mut partition = DailyPartition::default();

    for habit in habits.iter().filter(|habit| habit.is_visible_to(user)) {
        if !is_due_on(habit, today) {
            partition.not_due.push(habit.clone());
            continue;
        }
        let logs = fetch(source, habit, user, DateRange::single(today))?;
        if count_completed(&logs, &habit.id, user, today) >= habit.required() {
            partition.done_today.push(habit.clone());
        } else {
            partition.due.push(habit.clone());
        }
    }

    tracing::debug!(
        %user,
        %today,
        due = partition.due.len(),
        done = partition.done_today.len(),
        not_due = partition.not_due.len(),
        "partitioned habits"
    );
    Ok(partition)
}
