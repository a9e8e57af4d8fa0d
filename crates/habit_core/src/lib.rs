pub mod completion;
pub mod error;
pub mod habit;
pub mod partition;
pub mod rollup;
pub mod schedule;
pub mod service;
pub mod store;
pub mod streak;

pub use crate::completion::LogSource;
pub use crate::error::{HabitError, LogSourceError};
pub use crate::habit::{Habit, HabitLog, NewLog, Schedule, UserId};
pub use crate::schedule::{is_due_on, DateRange};
pub use crate::service::{HabitEngine, HabitEngineBuilder};
pub use crate::store::InMemoryLogStore;
