use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use crate::completion::LogSource;
use crate::error::{HabitError, LogSourceError, Result};
use crate::habit::{Habit, HabitLog, NewLog, UserId};
use crate::schedule::{is_due_on, DateRange};

/// Thread-safe log store used by the report binary and tests. Enforces the
/// recording rules; persisted logs loaded through [`InMemoryLogStore::import`]
/// are taken as-is.
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    logs: RwLock<HashMap<String, HabitLog>>,
    next_id: AtomicU64,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_logs(logs: impl IntoIterator<Item = HabitLog>) -> Self {
        let store = Self::new();
        for log in logs {
            store.import(log);
        }
        store
    }

    /// Inserts an existing log, replacing any log with the same id.
    pub fn import(&self, log: HabitLog) {
        self.logs.write().insert(log.id.clone(), log);
    }

    pub fn len(&self) -> usize {
        self.logs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records a completion event for a due date.
    ///
    /// Rejects dates the habit is not scheduled on and days that already hold
    /// `required_per_period` logs. The check and the insert happen under one
    /// write lock.
    #[instrument(skip(self, habit, request), fields(habit_id = %habit.id, date = %request.date))]
    pub fn record(&self, habit: &Habit, request: NewLog) -> Result<HabitLog> {
        if request.habit_id != habit.id {
            return Err(HabitError::InvalidInput(format!(
                "log for habit `{}` recorded against habit `{}`",
                request.habit_id, habit.id
            )));
        }
        if let Some(owner) = &habit.owner {
            if owner != &request.user_id {
                return Err(HabitError::InvalidInput(format!(
                    "habit `{}` does not belong to user `{}`",
                    habit.id, request.user_id
                )));
            }
        }
        if !is_due_on(habit, request.date) {
            return Err(HabitError::NotDue {
                habit_id: habit.id.clone(),
                date: request.date,
            });
        }

        let mut logs = self.logs.write();
        let existing = logs
            .values()
            .filter(|log| log.matches(&habit.id, &request.user_id, request.date))
            .count() as u32;
        if existing >= habit.required() {
            return Err(HabitError::DailyLimitReached {
                habit_id: habit.id.clone(),
                date: request.date,
                limit: habit.required(),
            });
        }

        let id = self.fresh_id(&logs);
        let log = HabitLog {
            id: id.clone(),
            habit_id: request.habit_id,
            user_id: request.user_id,
            date: request.date,
            completed: request.completed.unwrap_or(true),
            notes: request.notes.filter(|notes| !notes.trim().is_empty()),
        };
        logs.insert(id, log.clone());
        info!(log_id = %log.id, completed = log.completed, "habit log recorded");
        Ok(log)
    }

    /// Every log of the habit for the user, newest first.
    pub fn logs_for_habit(&self, habit_id: &str, user: &UserId) -> Vec<HabitLog> {
        let mut logs: Vec<HabitLog> = self
            .logs
            .read()
            .values()
            .filter(|log| log.habit_id == habit_id && &log.user_id == user)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        logs
    }

    pub fn delete_log(&self, log_id: &str, user: &UserId) -> Result<HabitLog> {
        let mut logs = self.logs.write();
        match logs.get(log_id) {
            Some(log) if &log.user_id == user => {}
            _ => return Err(HabitError::LogNotFound(log_id.to_string())),
        }
        let removed = logs
            .remove(log_id)
            .ok_or_else(|| HabitError::LogNotFound(log_id.to_string()))?;
        debug!(log_id, "habit log deleted");
        Ok(removed)
    }

    /// Removes every log of the habit owned by the user. Returns how many went.
    pub fn delete_all_for_habit(&self, habit_id: &str, user: &UserId) -> usize {
        let mut logs = self.logs.write();
        let before = logs.len();
        logs.retain(|_, log| !(log.habit_id == habit_id && &log.user_id == user));
        let removed = before - logs.len();
        info!(habit_id, %user, removed, "cleared habit logs");
        removed
    }

    fn fresh_id(&self, logs: &HashMap<String, HabitLog>) -> String {
        loop {
            let id = format!("log-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
            if !logs.contains_key(&id) {
                return id;
            }
        }
    }
}

impl LogSource for InMemoryLogStore {
    fn fetch_logs(
        &self,
        habit_id: &str,
        user: &UserId,
        range: DateRange,
    ) -> std::result::Result<Vec<HabitLog>, LogSourceError> {
        Ok(self
            .logs
            .read()
            .values()
            .filter(|log| {
                log.habit_id == habit_id && &log.user_id == user && range.contains(log.date)
            })
            .cloned()
            .collect())
    }
}
