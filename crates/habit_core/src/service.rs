use anyhow::{anyhow, Result as AnyResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    completion::{self, LogSource},
    error::Result,
    habit::{Habit, UserId},
    partition::{self, DailyPartition},
    rollup::{self, DayPoint, MonthlySeries},
    schedule,
    streak::{self, Streak},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub streak_lookback_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            streak_lookback_days: 365,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitSummary {
    pub habit_id: String,
    pub title: String,
    pub due: bool,
    pub completed_today: u32,
    pub weekly: Vec<DayPoint>,
    pub streak: Streak,
}

/// Everything a dashboard renders for one user on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub date: NaiveDate,
    pub user_id: UserId,
    pub pending: Vec<Habit>,
    pub dashboard: Vec<Habit>,
    pub habits: Vec<HabitSummary>,
}

/// Runs the scheduling components against one log source.
pub struct HabitEngine<S> {
    source: S,
    config: EngineConfig,
}

pub struct HabitEngineBuilder<S> {
    source: Option<S>,
    config: EngineConfig,
}

impl<S: LogSource> HabitEngineBuilder<S> {
    pub fn new() -> Self {
        Self {
            source: None,
            config: EngineConfig::default(),
        }
    }

    pub fn log_source(mut self, source: S) -> Self {
        self.source = Some(source);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn streak_lookback_days(mut self, days: u32) -> Self {
        self.config.streak_lookback_days = days;
        self
    }

    pub fn build(self) -> AnyResult<HabitEngine<S>> {
        let source = self
            .source
            .ok_or_else(|| anyhow!("habit engine needs a log source"))?;
        anyhow::ensure!(
            self.config.streak_lookback_days > 0,
            "streak lookback must be at least one day"
        );
        Ok(HabitEngine {
            source,
            config: self.config,
        })
    }
}

impl<S: LogSource> Default for HabitEngineBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: LogSource> HabitEngine<S> {
    pub fn builder() -> HabitEngineBuilder<S> {
        HabitEngineBuilder::new()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn is_due(&self, habit: &Habit, date: NaiveDate) -> bool {
        schedule::is_due_on(habit, date)
    }

    pub fn completed_count(&self, habit: &Habit, user: &UserId, date: NaiveDate) -> Result<u32> {
        completion::completed_count_on(&self.source, habit, user, date)
    }

    pub fn is_satisfied(&self, habit: &Habit, user: &UserId, date: NaiveDate) -> Result<bool> {
        completion::is_satisfied_on(&self.source, habit, user, date)
    }

    #[instrument(skip(self, habits), fields(habits = habits.len()))]
    pub fn partition_for_today(
        &self,
        habits: &[Habit],
        user: &UserId,
        today: NaiveDate,
    ) -> Result<DailyPartition> {
        partition::partition_for_today(&self.source, habits, user, today)
    }

    #[instrument(skip(self, habit), fields(habit_id = %habit.id))]
    pub fn weekly_series(
        &self,
        habit: &Habit,
        user: &UserId,
        today: NaiveDate,
    ) -> Result<Vec<DayPoint>> {
        rollup::weekly_series(&self.source, habit, user, today)
    }

    #[instrument(skip(self, habit), fields(habit_id = %habit.id))]
    pub fn monthly_series(
        &self,
        habit: &Habit,
        user: &UserId,
        today: NaiveDate,
    ) -> Result<MonthlySeries> {
        rollup::monthly_series(&self.source, habit, user, today)
    }

    pub fn streak(&self, habit: &Habit, user: &UserId, today: NaiveDate) -> Result<Streak> {
        streak::streak(
            &self.source,
            habit,
            user,
            today,
            self.config.streak_lookback_days,
        )
    }

    #[instrument(skip(self, habits), fields(habits = habits.len()))]
    pub fn dashboard(
        &self,
        habits: &[Habit],
        user: &UserId,
        today: NaiveDate,
    ) -> Result<DashboardSnapshot> {
        let partition = self.partition_for_today(habits, user, today)?;
        let dashboard = partition.dashboard_view().into_iter().cloned().collect();

        let mut summaries = Vec::new();
        for habit in habits.iter().filter(|habit| habit.is_visible_to(user)) {
            let weekly = self.weekly_series(habit, user, today)?;
            let completed_today = weekly.last().map(|point| point.count).unwrap_or(0);
            summaries.push(HabitSummary {
                habit_id: habit.id.clone(),
                title: habit.title.clone(),
                due: self.is_due(habit, today),
                completed_today,
                weekly,
                streak: self.streak(habit, user, today)?,
            });
        }

        Ok(DashboardSnapshot {
            date: today,
            user_id: user.clone(),
            pending: partition.due,
            dashboard,
            habits: summaries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::fixtures::{day, user};
    use crate::habit::{MonthDaySet, NewLog, Schedule};
    use crate::store::InMemoryLogStore;

    fn engine() -> HabitEngine<InMemoryLogStore> {
        HabitEngine::builder()
            .log_source(InMemoryLogStore::new())
            .streak_lookback_days(60)
            .build()
            .expect("engine")
    }

    #[test]
    fn builder_requires_a_source() {
        let result = HabitEngineBuilder::<InMemoryLogStore>::new().build();
        assert!(result.is_err());
        let result = HabitEngine::builder()
            .log_source(InMemoryLogStore::new())
            .streak_lookback_days(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn dashboard_combines_partition_and_rollups() {
        let engine = engine();
        let u1 = user("u1");
        let today = day(2024, 3, 15);
        let run = Habit::new("run", Schedule::Daily).with_title("Run");
        let pay = Habit::new(
            "pay",
            Schedule::Monthly(MonthDaySet::from_days(&[1, 15]).unwrap()),
        )
        .with_title("Pay bills");
        let old = Habit::new("old", Schedule::Daily).archived(true);

        engine
            .source()
            .record(&pay, NewLog::completion("pay", u1.clone(), today))
            .unwrap();
        engine
            .source()
            .record(&run, NewLog::completion("run", u1.clone(), day(2024, 3, 14)))
            .unwrap();

        let snapshot = engine
            .dashboard(&[run.clone(), pay.clone(), old], &u1, today)
            .unwrap();

        assert_eq!(snapshot.pending, vec![run]);
        assert_eq!(snapshot.dashboard, vec![pay]);
        assert_eq!(snapshot.habits.len(), 2);

        let run_summary = &snapshot.habits[0];
        assert!(run_summary.due);
        assert_eq!(run_summary.completed_today, 0);
        assert_eq!(run_summary.streak.current, 1);
        assert_eq!(run_summary.weekly.len(), 7);

        let pay_summary = &snapshot.habits[1];
        assert_eq!(pay_summary.completed_today, 1);
        assert_eq!(pay_summary.streak.current, 1);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["date"], "2024-03-15");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["pending"][0]["frequency"], "daily");
    }
}
