use std::fmt;
use std::num::NonZeroU32;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{HabitError, Result};
use crate::schedule::parse_utc_day;

/// Identifier of the user every scheduling call is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(HabitError::MissingUser);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = HabitError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Weekdays a habit is scheduled on, indexed 0 (Sunday) to 6 (Saturday).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub fn from_indices(indices: &[u8]) -> Result<Self> {
        let mut bits = 0u8;
        for &index in indices {
            if index > 6 {
                return Err(HabitError::InvalidInput(format!(
                    "day of week {index} is outside 0..=6"
                )));
            }
            bits |= 1 << index;
        }
        Ok(Self(bits))
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0 & (1 << weekday.num_days_from_sunday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn indices(&self) -> Vec<u8> {
        (0..7).filter(|index| self.0 & (1 << index) != 0).collect()
    }
}

/// Days of the month a habit is scheduled on, 1 to 31.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MonthDaySet(u32);

impl MonthDaySet {
    pub fn from_days(days: &[u8]) -> Result<Self> {
        let mut bits = 0u32;
        for &day in days {
            if !(1..=31).contains(&day) {
                return Err(HabitError::InvalidInput(format!(
                    "day of month {day} is outside 1..=31"
                )));
            }
            bits |= 1 << day;
        }
        Ok(Self(bits))
    }

    pub fn contains_day_of(&self, date: NaiveDate) -> bool {
        self.0 & (1 << date.day()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn days(&self) -> Vec<u8> {
        (1..=31).filter(|day| self.0 & (1 << day) != 0).collect()
    }
}

/// Frequency rule of a habit. Each variant carries only the day sets it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    Daily,
    Weekly(WeekdaySet),
    Monthly(MonthDaySet),
    Custom {
        days_of_week: WeekdaySet,
        days_of_month: MonthDaySet,
    },
    /// A frequency string this build does not know. Never due.
    Unrecognized(String),
}

impl Schedule {
    pub fn frequency_name(&self) -> &str {
        match self {
            Schedule::Daily => "daily",
            Schedule::Weekly(_) => "weekly",
            Schedule::Monthly(_) => "monthly",
            Schedule::Custom { .. } => "custom",
            Schedule::Unrecognized(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HabitRecord", into = "HabitRecord")]
pub struct Habit {
    pub id: String,
    pub owner: Option<UserId>,
    pub title: String,
    pub schedule: Schedule,
    pub required_per_period: NonZeroU32,
    pub archived: bool,
}

impl Habit {
    pub fn new(id: impl Into<String>, schedule: Schedule) -> Self {
        Self {
            id: id.into(),
            owner: None,
            title: String::new(),
            schedule,
            required_per_period: NonZeroU32::MIN,
            archived: false,
        }
    }

    pub fn with_required_per_period(mut self, required: NonZeroU32) -> Self {
        self.required_per_period = required;
        self
    }

    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.archived = archived;
        self
    }

    pub fn required(&self) -> u32 {
        self.required_per_period.get()
    }

    /// Rejects schedules that can never select a day. Called by whatever
    /// layer creates or updates habits; the evaluator itself never validates.
    pub fn validate(&self) -> Result<()> {
        let reason = match &self.schedule {
            Schedule::Weekly(days) if days.is_empty() => "weekly habits need at least one weekday",
            Schedule::Monthly(days) if days.is_empty() => {
                "monthly habits need at least one day of the month"
            }
            Schedule::Custom {
                days_of_week,
                days_of_month,
            } if days_of_week.is_empty() && days_of_month.is_empty() => {
                "custom habits need a weekday or a day of the month"
            }
            Schedule::Unrecognized(raw) => {
                return Err(HabitError::InvalidSchedule {
                    habit_id: self.id.clone(),
                    reason: format!("unknown frequency `{raw}`"),
                })
            }
            _ => return Ok(()),
        };
        Err(HabitError::InvalidSchedule {
            habit_id: self.id.clone(),
            reason: reason.to_string(),
        })
    }

    pub fn is_visible_to(&self, user: &UserId) -> bool {
        !self.archived && self.owner.as_ref().map_or(true, |owner| owner == user)
    }
}

/// Wire shape of a habit as stored and exchanged as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_frequency")]
    pub frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_frequency: Option<CustomFrequencyRecord>,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFrequencyRecord {
    #[serde(default)]
    pub days_of_week: Vec<u8>,
    #[serde(default)]
    pub days_of_month: Vec<u8>,
    #[serde(default = "default_required")]
    pub required_per_period: u32,
}

fn default_frequency() -> String {
    "daily".to_string()
}

fn default_required() -> u32 {
    1
}

impl TryFrom<HabitRecord> for Habit {
    type Error = HabitError;

    fn try_from(record: HabitRecord) -> Result<Self> {
        let custom = record.custom_frequency.unwrap_or(CustomFrequencyRecord {
            days_of_week: Vec::new(),
            days_of_month: Vec::new(),
            required_per_period: default_required(),
        });
        let days_of_week = WeekdaySet::from_indices(&custom.days_of_week)?;
        let days_of_month = MonthDaySet::from_days(&custom.days_of_month)?;
        let required_per_period = NonZeroU32::new(custom.required_per_period).ok_or_else(|| {
            HabitError::InvalidInput(format!(
                "habit `{}` requires at least one completion per period",
                record.id
            ))
        })?;

        let schedule = match record.frequency.as_str() {
            "daily" => Schedule::Daily,
            "weekly" => Schedule::Weekly(days_of_week),
            "monthly" => Schedule::Monthly(days_of_month),
            "custom" => Schedule::Custom {
                days_of_week,
                days_of_month,
            },
            other => {
                tracing::warn!(habit_id = %record.id, frequency = other, "unrecognized habit frequency");
                Schedule::Unrecognized(other.to_string())
            }
        };

        let owner = record.user_id.map(UserId::new).transpose()?;

        Ok(Habit {
            id: record.id,
            owner,
            title: record.title,
            schedule,
            required_per_period,
            archived: record.archived,
        })
    }
}

impl From<Habit> for HabitRecord {
    fn from(habit: Habit) -> Self {
        let required_per_period = habit.required();
        let (days_of_week, days_of_month) = match &habit.schedule {
            Schedule::Daily | Schedule::Unrecognized(_) => (Vec::new(), Vec::new()),
            Schedule::Weekly(days) => (days.indices(), Vec::new()),
            Schedule::Monthly(days) => (Vec::new(), days.days()),
            Schedule::Custom {
                days_of_week,
                days_of_month,
            } => (days_of_week.indices(), days_of_month.days()),
        };
        let custom_frequency = if days_of_week.is_empty()
            && days_of_month.is_empty()
            && required_per_period == 1
            && matches!(habit.schedule, Schedule::Daily)
        {
            None
        } else {
            Some(CustomFrequencyRecord {
                days_of_week,
                days_of_month,
                required_per_period,
            })
        };

        HabitRecord {
            id: habit.id,
            user_id: habit.owner.map(String::from),
            title: habit.title,
            frequency: habit.schedule.frequency_name().to_string(),
            custom_frequency,
            archived: habit.archived,
        }
    }
}

/// One completion event. Edits are modelled as delete + recreate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitLog {
    pub id: String,
    pub habit_id: String,
    pub user_id: UserId,
    #[serde(deserialize_with = "deserialize_utc_day")]
    pub date: NaiveDate,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl HabitLog {
    pub fn matches(&self, habit_id: &str, user: &UserId, date: NaiveDate) -> bool {
        self.habit_id == habit_id && &self.user_id == user && self.date == date
    }
}

/// Request to record a completion. `completed` defaults to true.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLog {
    pub habit_id: String,
    pub user_id: UserId,
    #[serde(deserialize_with = "deserialize_utc_day")]
    pub date: NaiveDate,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewLog {
    pub fn completion(habit_id: impl Into<String>, user_id: UserId, date: NaiveDate) -> Self {
        Self {
            habit_id: habit_id.into(),
            user_id,
            date,
            completed: None,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn missed(mut self) -> Self {
        self.completed = Some(false);
        self
    }
}

fn deserialize_utc_day<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_utc_day(&raw).map_err(serde::de::Error::custom)
}
