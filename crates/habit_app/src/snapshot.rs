use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use habit_core::{Habit, HabitLog, InMemoryLogStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Habits and logs exported from the document store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub logs: Vec<HabitLog>,
}

impl Snapshot {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("unable to read snapshot {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("malformed snapshot {}", path.display()))?;
        for habit in &snapshot.habits {
            if let Err(err) = habit.validate() {
                warn!(habit_id = %habit.id, %err, "stored habit will never be due");
            }
        }
        info!(
            path = %path.display(),
            habits = snapshot.habits.len(),
            logs = snapshot.logs.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Splits the snapshot into the habit list and a log store over its logs.
    pub fn into_parts(self) -> (Vec<Habit>, InMemoryLogStore) {
        let store = InMemoryLogStore::from_logs(self.logs);
        (self.habits, store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_reports_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ \"habits\": [ {{ \"id\": 3 }} ] }}").unwrap();
        let err = Snapshot::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("malformed snapshot"));
    }

    #[test]
    fn load_rejects_bad_log_dates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "logs": [ {{ "id": "l1", "habitId": "h1", "userId": "u1", "date": "2024-02-30" }} ] }}"#
        )
        .unwrap();
        assert!(Snapshot::load(file.path()).is_err());
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        let (habits, store) = Snapshot::load(file.path()).unwrap().into_parts();
        assert!(habits.is_empty());
        assert!(store.is_empty());
    }
}
