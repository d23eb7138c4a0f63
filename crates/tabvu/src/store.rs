//! Local persistence for saved queries and schedules.
//!
//! Two JSON files in the data directory, each an array of definitions.
//! Every mutation rewrites the whole file; at this scale simplicity
//! wins over incremental writes. The stores are the single source of
//! truth: live trigger handles are always derived from the schedule
//! store at startup, never the other way around.

use crate::TabvuError;
use crate::model::{QueryDefinition, Schedule};
use diagnostics::*;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const QUERIES_FILE: &str = "saved_queries.json";
pub const SCHEDULES_FILE: &str = "saved_schedules.json";

/// What happened to a query save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Added,
    Replaced,
    /// A query with this name already exists and `overwrite` was not
    /// set; nothing was written. Callers confirm with the user and try
    /// again.
    NeedsConfirmation,
}

/// Named query definitions persisted to `saved_queries.json`.
pub struct QueryStore {
    path: PathBuf,
    queries: Vec<QueryDefinition>,
}

impl QueryStore {
    /// Opens the store inside `data_dir`, creating the directory when
    /// missing and loading whatever is already persisted. Entries that
    /// fail to decode are skipped with a warning, not fatal.
    pub fn open(data_dir: &Path) -> Result<Self, TabvuError> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(QUERIES_FILE);
        let queries = load_entries(&path, "saved query");
        Ok(Self { path, queries })
    }

    pub fn queries(&self) -> &[QueryDefinition] {
        &self.queries
    }

    pub fn get(&self, name: &str) -> Option<&QueryDefinition> {
        self.queries.iter().find(|q| q.name == name)
    }

    /// Saves a definition under its name. Duplicate names are only
    /// replaced when `overwrite` is set.
    pub fn save(
        &mut self,
        definition: QueryDefinition,
        overwrite: bool,
    ) -> Result<SaveOutcome, TabvuError> {
        if definition.name.trim().is_empty() {
            return Err(TabvuError::Validation("query name is empty".into()));
        }
        let outcome = match self.queries.iter().position(|q| q.name == definition.name) {
            Some(index) => {
                if !overwrite {
                    return Ok(SaveOutcome::NeedsConfirmation);
                }
                self.queries[index] = definition;
                SaveOutcome::Replaced
            }
            None => {
                self.queries.push(definition);
                SaveOutcome::Added
            }
        };
        persist(&self.path, &self.queries)?;
        Ok(outcome)
    }

    /// Removes a query by name, rewriting the file. Returns whether a
    /// query was actually removed.
    pub fn remove(&mut self, name: &str) -> Result<bool, TabvuError> {
        let before = self.queries.len();
        self.queries.retain(|q| q.name != name);
        if self.queries.len() == before {
            return Ok(false);
        }
        persist(&self.path, &self.queries)?;
        Ok(true)
    }
}

/// Recurring export jobs persisted to `saved_schedules.json`.
pub struct ScheduleStore {
    path: PathBuf,
    schedules: Vec<Schedule>,
}

impl ScheduleStore {
    pub fn open(data_dir: &Path) -> Result<Self, TabvuError> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(SCHEDULES_FILE);
        let schedules = load_entries(&path, "saved schedule");
        Ok(Self { path, schedules })
    }

    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    pub fn get(&self, name: &str) -> Option<&Schedule> {
        self.schedules.iter().find(|s| s.name == name)
    }

    /// Saves a schedule; an identical name updates in place. Returns
    /// true when an existing schedule was replaced.
    pub fn upsert(&mut self, schedule: Schedule) -> Result<bool, TabvuError> {
        schedule.validate()?;
        validate_output_dir(&schedule.output_dir)?;
        let replaced = match self
            .schedules
            .iter()
            .position(|s| s.name == schedule.name)
        {
            Some(index) => {
                self.schedules[index] = schedule;
                true
            }
            None => {
                self.schedules.push(schedule);
                false
            }
        };
        persist(&self.path, &self.schedules)?;
        Ok(replaced)
    }

    /// Removes a schedule by name, rewriting the file. The caller is
    /// responsible for cancelling the live trigger (destructive, so the
    /// outer surface confirms first).
    pub fn remove(&mut self, name: &str) -> Result<bool, TabvuError> {
        let before = self.schedules.len();
        self.schedules.retain(|s| s.name != name);
        if self.schedules.len() == before {
            return Ok(false);
        }
        persist(&self.path, &self.schedules)?;
        Ok(true)
    }
}

fn validate_output_dir(dir: &Path) -> Result<(), TabvuError> {
    let metadata = fs::metadata(dir).map_err(|_| {
        TabvuError::Validation(format!("output directory {} does not exist", dir.display()))
    })?;
    if !metadata.is_dir() {
        return Err(TabvuError::Validation(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    if metadata.permissions().readonly() {
        return Err(TabvuError::Validation(format!(
            "output directory {} is not writable",
            dir.display()
        )));
    }
    Ok(())
}

/// Loads a store file as an array of entries, dropping entries that do
/// not decode so one corrupt record never takes the rest down.
fn load_entries<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Vec<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Vec::new(),
    };
    let raw: Vec<Value> = match serde_json::from_str(&content) {
        Ok(raw) => raw,
        Err(e) => {
            let file = path.display().to_string();
            let reason = e.to_string();
            error!("could not parse {file}: {reason}");
            return Vec::new();
        }
    };
    let mut entries = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value::<T>(value) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                let reason = e.to_string();
                warn!("skipping {what} that could not be decoded: {reason}");
            }
        }
    }
    entries
}

fn persist<T: Serialize>(path: &Path, entries: &[T]) -> Result<(), TabvuError> {
    let content = serde_json::to_string_pretty(entries)?;
    fs::write(path, content)?;
    Ok(())
}
