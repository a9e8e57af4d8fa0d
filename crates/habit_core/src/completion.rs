use chrono::NaiveDate;

use crate::error::{HabitError, LogSourceError, Result};
use crate::habit::{Habit, HabitLog, UserId};
use crate::schedule::DateRange;

/// Supplies habit logs to the engine. Implemented by the persistence layer;
/// [`crate::store::InMemoryLogStore`] is the bundled implementation.
pub trait LogSource: Send + Sync {
    /// Logs of `habit_id` owned by `user` whose date falls in `range`.
    fn fetch_logs(
        &self,
        habit_id: &str,
        user: &UserId,
        range: DateRange,
    ) -> std::result::Result<Vec<HabitLog>, LogSourceError>;
}

impl<S: LogSource + ?Sized> LogSource for &S {
    fn fetch_logs(
        &self,
        habit_id: &str,
        user: &UserId,
        range: DateRange,
    ) -> std::result::Result<Vec<HabitLog>, LogSourceError> {
        (**self).fetch_logs(habit_id, user, range)
    }
}

impl<S: LogSource + ?Sized> LogSource for Box<S> {
    fn fetch_logs(
        &self,
        habit_id: &str,
        user: &UserId,
        range: DateRange,
    ) -> std::result::Result<Vec<HabitLog>, LogSourceError> {
        (**self).fetch_logs(habit_id, user, range)
    }
}

/// Fetches logs for the habit and wraps collaborator failures. A failed fetch
/// is never reported as "no logs".
pub(crate) fn fetch<S: LogSource + ?Sized>(
    source: &S,
    habit: &Habit,
    user: &UserId,
    range: DateRange,
) -> Result<Vec<HabitLog>> {
    source
        .fetch_logs(&habit.id, user, range)
        .map_err(|source| {
            tracing::warn!(habit_id = %habit.id, %user, error = %source, "log fetch failed");
            HabitError::LogSource {
                habit_id: habit.id.clone(),
                source,
            }
        })
}

/// Counts `completed == true` logs of the habit and user on `date`. Logs for
/// other habits, users or days are ignored even if the source returned them.
pub fn count_completed(logs: &[HabitLog], habit_id: &str, user: &UserId, date: NaiveDate) -> u32 {
    logs.iter()
        .filter(|log| log.completed && log.matches(habit_id, user, date))
        .count() as u32
}

pub fn completed_count_on<S: LogSource + ?Sized>(
    source: &S,
    habit: &Habit,
    user: &UserId,
    date: NaiveDate,
) -> Result<u32> {
    let logs = fetch(source, habit, user, DateRange::single(date))?;
    Ok(count_completed(&logs, &habit.id, user, date))
}

/// True once the day's completed-log count reaches `required_per_period`.
/// Extra completions beyond the requirement are fine.
pub fn is_satisfied_on<S: LogSource + ?Sized>(
    source: &S,
    habit: &Habit,
    user: &UserId,
    date: NaiveDate,
) -> Result<bool> {
    Ok(completed_count_on(source, habit, user, date)? >= habit.required())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Returns every log it holds regardless of the query, and counts calls.
    #[derive(Default)]
    pub struct VecSource {
        pub logs: Vec<HabitLog>,
        pub calls: AtomicUsize,
    }

    impl VecSource {
        pub fn new(logs: Vec<HabitLog>) -> Self {
            Self {
                logs,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl LogSource for VecSource {
        fn fetch_logs(
            &self,
            _habit_id: &str,
            _user: &UserId,
            _range: DateRange,
        ) -> std::result::Result<Vec<HabitLog>, LogSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.logs.clone())
        }
    }

    pub struct FailingSource;

    impl LogSource for FailingSource {
        fn fetch_logs(
            &self,
            _habit_id: &str,
            _user: &UserId,
            _range: DateRange,
        ) -> std::result::Result<Vec<HabitLog>, LogSourceError> {
            Err("connection refused".into())
        }
    }

    pub fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn log(habit_id: &str, user_id: &str, date: NaiveDate, completed: bool) -> HabitLog {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        HabitLog {
            id: format!("log-{}", NEXT.fetch_add(1, Ordering::Relaxed)),
            habit_id: habit_id.to_string(),
            user_id: user(user_id),
            date,
            completed,
            notes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::fixtures::*;
    use super::*;
    use crate::habit::Schedule;

    fn habit(required: u32) -> Habit {
        Habit::new("h1", Schedule::Daily)
            .with_required_per_period(NonZeroU32::new(required).unwrap())
    }

    #[test]
    fn counts_only_completed_logs_for_the_pair_and_day() {
        let today = day(2024, 3, 15);
        let source = VecSource::new(vec![
            log("h1", "u1", today, true),
            log("h1", "u1", today, false),
            log("h1", "u2", today, true),
            log("h2", "u1", today, true),
            log("h1", "u1", day(2024, 3, 14), true),
        ]);
        let count = completed_count_on(&source, &habit(1), &user("u1"), today).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn threshold_requires_enough_completions() {
        let today = day(2024, 3, 15);
        let u1 = user("u1");
        let mut logs = vec![log("h1", "u1", today, true)];

        let source = VecSource::new(logs.clone());
        assert!(!is_satisfied_on(&source, &habit(2), &u1, today).unwrap());

        logs.push(log("h1", "u1", today, true));
        let source = VecSource::new(logs.clone());
        assert!(is_satisfied_on(&source, &habit(2), &u1, today).unwrap());

        logs.push(log("h1", "u1", today, true));
        let source = VecSource::new(logs);
        assert!(is_satisfied_on(&source, &habit(2), &u1, today).unwrap());
    }

    #[test]
    fn incomplete_logs_do_not_satisfy() {
        let today = day(2024, 3, 15);
        let source = VecSource::new(vec![
            log("h1", "u1", today, false),
            log("h1", "u1", today, false),
        ]);
        assert!(!is_satisfied_on(&source, &habit(1), &user("u1"), today).unwrap());
    }

    #[test]
    fn fetch_failures_are_surfaced() {
        let err = is_satisfied_on(&FailingSource, &habit(1), &user("u1"), day(2024, 3, 15))
            .unwrap_err();
        assert!(matches!(err, HabitError::LogSource { ref habit_id, .. } if habit_id == "h1"));
        assert!(!err.is_client_error());
    }
}
