use chrono::NaiveDate;
use thiserror::Error;

/// Failure reported by a log collaborator (database, HTTP client, fixture).
pub type LogSourceError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum HabitError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("a user id is required")]
    MissingUser,

    #[error("invalid schedule for habit `{habit_id}`: {reason}")]
    InvalidSchedule { habit_id: String, reason: String },

    #[error("habit `{habit_id}` is not scheduled on {date}")]
    NotDue { habit_id: String, date: NaiveDate },

    #[error("habit `{habit_id}` already has {limit} log(s) on {date}")]
    DailyLimitReached {
        habit_id: String,
        date: NaiveDate,
        limit: u32,
    },

    #[error("habit log `{0}` not found")]
    LogNotFound(String),

    #[error("failed to fetch logs for habit `{habit_id}`")]
    LogSource {
        habit_id: String,
        #[source]
        source: LogSourceError,
    },
}

impl HabitError {
    /// True for errors caused by the caller's input rather than a collaborator.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, HabitError::LogSource { .. })
    }
}

pub type Result<T, E = HabitError> = std::result::Result<T, E>;
