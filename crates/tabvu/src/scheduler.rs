//! Recurring trigger engine.
//!
//! The schedule store owns the canonical schedule list; this engine
//! holds only derived, disposable trigger handles keyed by job id.
//! Handles are never persisted - on startup [`TriggerEngine::replay`]
//! rebuilds them all from the store. Each trigger is a tokio task that
//! sleeps until the next computed fire time, runs the schedule through
//! the pipeline, and goes back to sleep; a failed run is logged and
//! never disturbs other schedules.

use crate::TabvuError;
use crate::export::ExportOutcome;
use crate::model::{Cadence, Schedule, TimeOfDay};
use async_trait::async_trait;
use chrono::{Datelike, Days, Local, Months, NaiveDate, NaiveDateTime, NaiveTime};
use diagnostics::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Job id for a schedule name: `query_` plus the name with spaces
/// replaced by underscores.
pub fn job_id(schedule_name: &str) -> String {
    format!("query_{}", schedule_name.replace(' ', "_"))
}

impl Cadence {
    /// The first fire time strictly after `after`.
    ///
    /// Monthly cadences clamp a day-of-month the month does not have to
    /// its last day (31 fires on April 30, February 28/29); skipping
    /// the month entirely would surprise more than firing a day early.
    pub fn next_fire_after(self, after: NaiveDateTime, time: TimeOfDay) -> NaiveDateTime {
        match self {
            Self::Daily => {
                let today = fire_at(after.date(), time);
                if today > after {
                    today
                } else {
                    fire_at(after.date() + Days::new(1), time)
                }
            }
            Self::Weekly { day_of_week } => {
                let current = after.date().weekday().num_days_from_monday() as i64;
                let ahead = (day_of_week as i64 - current).rem_euclid(7) as u64;
                let candidate = fire_at(after.date() + Days::new(ahead), time);
                if candidate > after {
                    candidate
                } else {
                    fire_at(after.date() + Days::new(ahead + 7), time)
                }
            }
            Self::Monthly { day_of_month } => {
                let this_month = monthly_fire(after.date(), day_of_month, time);
                if this_month > after {
                    this_month
                } else {
                    let next_month = after
                        .date()
                        .checked_add_months(Months::new(1))
                        .unwrap_or(after.date());
                    monthly_fire(next_month, day_of_month, time)
                }
            }
        }
    }
}

fn fire_at(date: NaiveDate, time: TimeOfDay) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(time.hour as u32, time.minute as u32, 0)
        .unwrap_or(NaiveTime::MIN);
    date.and_time(time)
}

fn monthly_fire(in_month: NaiveDate, day_of_month: u8, time: TimeOfDay) -> NaiveDateTime {
    let day = (day_of_month as u32).min(days_in_month(in_month));
    let date = in_month.with_day(day).unwrap_or(in_month);
    fire_at(date, time)
}

fn days_in_month(date: NaiveDate) -> u32 {
    let first = date.with_day(1).unwrap_or(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// What a trigger invokes when it fires. The execution pipeline
/// implements this; tests substitute counters.
#[async_trait]
pub trait ScheduleRunner: Send + Sync {
    async fn run(&self, schedule: &Schedule) -> Result<ExportOutcome, TabvuError>;
}

struct TriggerHandle {
    schedule_name: String,
    task: JoinHandle<()>,
}

/// Live triggers, keyed by job id.
pub struct TriggerEngine {
    runner: Arc<dyn ScheduleRunner>,
    triggers: Mutex<HashMap<String, TriggerHandle>>,
}

impl TriggerEngine {
    pub fn new(runner: Arc<dyn ScheduleRunner>) -> Self {
        Self {
            runner,
            triggers: Mutex::new(HashMap::new()),
        }
    }

    /// Creates the live trigger for a schedule, replacing any existing
    /// trigger with the same job id. The swap happens under the map
    /// lock - there is never a window with two live triggers for one
    /// name.
    pub fn register(&self, schedule: &Schedule) -> Result<(), TabvuError> {
        schedule.validate()?;
        let id = job_id(&schedule.name);
        let task = self.spawn_fire_loop(schedule.clone());

        let mut triggers = self.triggers.lock().expect("trigger map poisoned");
        if let Some(old) = triggers.remove(&id) {
            old.task.abort();
            let name = old.schedule_name.as_str();
            debug!("replaced existing trigger for {name}");
        }
        triggers.insert(
            id,
            TriggerHandle {
                schedule_name: schedule.name.clone(),
                task,
            },
        );
        Ok(())
    }

    /// Cancels the live trigger for a schedule name, if any.
    pub fn remove(&self, schedule_name: &str) -> bool {
        let id = job_id(schedule_name);
        let mut triggers = self.triggers.lock().expect("trigger map poisoned");
        match triggers.remove(&id) {
            Some(handle) => {
                handle.task.abort();
                true
            }
            None => false,
        }
    }

    /// Rebuilds triggers from the persisted schedule list. A schedule
    /// that fails to reconstruct (bad cadence data, say) is logged and
    /// skipped; the rest still come up. Returns how many triggers were
    /// created.
    pub fn replay(&self, schedules: &[Schedule]) -> usize {
        let mut created = 0;
        for schedule in schedules {
            match self.register(schedule) {
                Ok(()) => created += 1,
                Err(e) => {
                    let name = schedule.name.as_str();
                    let reason = e.to_string();
                    warn!("could not recreate trigger for {name}: {reason}");
                }
            }
        }
        created
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.lock().expect("trigger map poisoned").len()
    }

    pub fn has_trigger(&self, schedule_name: &str) -> bool {
        self.triggers
            .lock()
            .expect("trigger map poisoned")
            .contains_key(&job_id(schedule_name))
    }

    /// Aborts every live trigger.
    pub fn shutdown(&self) {
        let mut triggers = self.triggers.lock().expect("trigger map poisoned");
        for (_, handle) in triggers.drain() {
            handle.task.abort();
        }
    }

    fn spawn_fire_loop(&self, schedule: Schedule) -> JoinHandle<()> {
        let runner = Arc::clone(&self.runner);
        tokio::spawn(async move {
            loop {
                let now = Local::now().naive_local();
                let next = schedule.cadence.next_fire_after(now, schedule.time);
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                let name = schedule.name.as_str();
                let next_run = next.to_string();
                debug!("schedule {name} sleeps until {next_run}");
                tokio::time::sleep(wait).await;

                match runner.run(&schedule).await {
                    Ok(ExportOutcome::Written { path, rows }) => {
                        let path = path.display().to_string();
                        info!("schedule {name} exported {rows} rows to {path}");
                    }
                    Ok(ExportOutcome::NoResults) => {
                        info!("schedule {name} returned no results, nothing exported");
                    }
                    Err(e) => {
                        // this run failed; the trigger stays alive for the
                        // next fire and other schedules are unaffected
                        let reason = e.to_string();
                        error!("scheduled run of {name} failed: {reason}");
                    }
                }
            }
        })
    }
}

impl Drop for TriggerEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
