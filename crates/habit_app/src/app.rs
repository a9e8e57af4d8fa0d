use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use habit_core::{
    rollup::MonthlySeries,
    schedule::{parse_utc_day, utc_day},
    service::{DashboardSnapshot, EngineConfig},
    Habit, HabitEngine, LogSource, UserId,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::snapshot::Snapshot;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) snapshot_path: PathBuf,
    pub(crate) user: UserId,
    pub(crate) today: NaiveDate,
    pub(crate) engine: EngineConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `HABIT_SNAPSHOT` and
    /// `HABIT_USER` are required; the user is never defaulted.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let snapshot_path = lookup("HABIT_SNAPSHOT")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .context("HABIT_SNAPSHOT is not set")?;
        let user = UserId::new(lookup("HABIT_USER").unwrap_or_default())
            .context("HABIT_USER is not set")?;

        let today = match lookup("HABIT_TODAY") {
            Some(raw) => parse_utc_day(&raw).context("HABIT_TODAY is not a valid date")?,
            None => utc_day(Utc::now()),
        };

        let mut engine = EngineConfig::default();
        if let Some(lookback) = lookup("HABIT_STREAK_LOOKBACK_DAYS") {
            match lookback.trim().parse::<u32>() {
                Ok(value) if value > 0 => engine.streak_lookback_days = value,
                _ => warn!(%lookback, "ignoring invalid HABIT_STREAK_LOOKBACK_DAYS"),
            }
        }

        info!(path = %snapshot_path.display(), %user, %today, "habit report configured");
        Ok(Self {
            snapshot_path,
            user,
            today,
            engine,
        })
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub habit_id: String,
    #[serde(flatten)]
    pub series: MonthlySeries,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitReport {
    pub dashboard: DashboardSnapshot,
    pub monthly: Vec<MonthlyReport>,
}

pub fn build_report<S: LogSource>(
    engine: &HabitEngine<S>,
    habits: &[Habit],
    user: &UserId,
    today: NaiveDate,
) -> Result<HabitReport> {
    let dashboard = engine
        .dashboard(habits, user, today)
        .context("failed to build dashboard")?;
    let mut monthly = Vec::new();
    for habit in habits.iter().filter(|habit| habit.is_visible_to(user)) {
        let series = engine
            .monthly_series(habit, user, today)
            .with_context(|| format!("failed to roll up habit `{}`", habit.id))?;
        monthly.push(MonthlyReport {
            habit_id: habit.id.clone(),
            series,
        });
    }
    debug!(habits = monthly.len(), "report built");
    Ok(HabitReport { dashboard, monthly })
}

/// Loads the snapshot and renders the report as pretty JSON.
pub fn run(config: &AppConfig) -> Result<String> {
    let (habits, store) = Snapshot::load(&config.snapshot_path)?.into_parts();
    let engine = HabitEngine::builder()
        .log_source(store)
        .config(config.engine)
        .build()?;
    let report = build_report(&engine, &habits, &config.user, config.today)?;
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn requires_snapshot_and_user() {
        assert!(AppConfig::from_lookup(lookup(&[("HABIT_USER", "u1")])).is_err());
        let err =
            AppConfig::from_lookup(lookup(&[("HABIT_SNAPSHOT", "habits.json")])).unwrap_err();
        assert!(err.to_string().contains("HABIT_USER"));
    }

    #[test]
    fn parses_optional_settings() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HABIT_SNAPSHOT", "habits.json"),
            ("HABIT_USER", "u1"),
            ("HABIT_TODAY", "2024-03-15"),
            ("HABIT_STREAK_LOOKBACK_DAYS", "90"),
        ]))
        .unwrap();
        assert_eq!(config.today(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(config.user().as_str(), "u1");
        assert_eq!(config.engine.streak_lookback_days, 90);
    }

    #[test]
    fn invalid_lookback_falls_back_but_bad_date_fails() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HABIT_SNAPSHOT", "habits.json"),
            ("HABIT_USER", "u1"),
            ("HABIT_STREAK_LOOKBACK_DAYS", "0"),
        ]))
        .unwrap();
        assert_eq!(
            config.engine.streak_lookback_days,
            EngineConfig::default().streak_lookback_days
        );

        let result = AppConfig::from_lookup(lookup(&[
            ("HABIT_SNAPSHOT", "habits.json"),
            ("HABIT_USER", "u1"),
            ("HABIT_TODAY", "2024-02-30"),
        ]));
        assert!(result.is_err());
    }
}
