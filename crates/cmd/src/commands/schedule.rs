use super::{confirm, connect, load_config};
use crate::Frequency;
use anyhow::{Result, anyhow, bail};
use chrono::Local;
use std::path::Path;
use std::sync::Arc;
use tabvu::{
    Cadence, ExecutionPipeline, ExportOutcome, QueryStore, Schedule, ScheduleStore, TimeOfDay,
};

fn cadence_from_args(
    frequency: Frequency,
    day_of_week: Option<u8>,
    day_of_month: Option<u8>,
) -> Result<Cadence> {
    match frequency {
        Frequency::Daily => Ok(Cadence::Daily),
        Frequency::Weekly => {
            let day_of_week =
                day_of_week.ok_or_else(|| anyhow!("weekly schedules need --day-of-week"))?;
            Ok(Cadence::Weekly { day_of_week })
        }
        Frequency::Monthly => {
            let day_of_month =
                day_of_month.ok_or_else(|| anyhow!("monthly schedules need --day-of-month"))?;
            Ok(Cadence::Monthly { day_of_month })
        }
    }
}

fn parse_time(at: &str) -> Result<TimeOfDay> {
    let (hour, minute) = at
        .split_once(':')
        .ok_or_else(|| anyhow!("time of day looks like HH:MM, got '{at}'"))?;
    let time = TimeOfDay {
        hour: hour.parse().map_err(|_| anyhow!("bad hour in '{at}'"))?,
        minute: minute.parse().map_err(|_| anyhow!("bad minute in '{at}'"))?,
    };
    time.validate()?;
    Ok(time)
}

pub fn save_command(
    config_path: &Path,
    name: &str,
    query_name: &str,
    frequency: Frequency,
    day_of_week: Option<u8>,
    day_of_month: Option<u8>,
    at: &str,
    out_dir: &Path,
    pattern: &str,
) -> Result<()> {
    let config = load_config(config_path)?;
    let cadence = cadence_from_args(frequency, day_of_week, day_of_month)?;
    let time = parse_time(at)?;

    let query_store = QueryStore::open(&config.data_dir)?;
    let query = query_store
        .get(query_name)
        .ok_or_else(|| anyhow!("no saved query named '{query_name}'"))?
        .clone();

    let schedule = Schedule {
        name: name.to_string(),
        // an owned snapshot: later edits to the saved query leave this
        // schedule's runs untouched
        query,
        cadence,
        time,
        output_dir: out_dir.to_path_buf(),
        output_pattern: pattern.to_string(),
    };

    let mut store = ScheduleStore::open(&config.data_dir)?;
    let replaced = store.upsert(schedule.clone())?;
    let action = if replaced { "Updated" } else { "Added" };
    let next = schedule
        .cadence
        .next_fire_after(Local::now().naive_local(), schedule.time);
    println!(
        "{action} schedule '{name}': runs {} at {}, next at {next}",
        schedule.cadence, schedule.time
    );
    println!("Run `tabvu serve` to keep schedules firing.");
    Ok(())
}

pub fn list_command(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let store = ScheduleStore::open(&config.data_dir)?;

    if store.schedules().is_empty() {
        println!("No schedules.");
        return Ok(());
    }

    let now = Local::now().naive_local();
    for schedule in store.schedules() {
        let next = schedule.cadence.next_fire_after(now, schedule.time);
        println!(
            "{} ({}): {} at {}, next at {next}",
            schedule.name, schedule.query.datasource_name, schedule.cadence, schedule.time
        );
    }
    Ok(())
}

pub fn remove_command(config_path: &Path, name: &str, yes: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let mut store = ScheduleStore::open(&config.data_dir)?;

    if store.get(name).is_none() {
        bail!("no schedule named '{name}'");
    }
    if !yes && !confirm(&format!("Remove the schedule '{name}'?"))? {
        println!("Nothing removed.");
        return Ok(());
    }
    store.remove(name)?;
    println!("Removed schedule '{name}'");
    println!("A running `tabvu serve` keeps its trigger until restarted.");
    Ok(())
}

/// Run one schedule's export immediately, through the same pipeline a
/// timed fire uses.
pub async fn run_now_command(config_path: &Path, name: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let store = ScheduleStore::open(&config.data_dir)?;
    let schedule = store
        .get(name)
        .ok_or_else(|| anyhow!("no schedule named '{name}'"))?
        .clone();

    let client = connect(&config)?;
    let pipeline = ExecutionPipeline::new(Arc::new(client));
    match pipeline
        .execute_and_export(
            &schedule.query,
            &schedule.name,
            &schedule.output_dir,
            &schedule.output_pattern,
        )
        .await?
    {
        ExportOutcome::Written { path, rows } => {
            println!("Wrote {rows} rows to {}", path.display());
        }
        ExportOutcome::NoResults => {
            println!("Query returned no results; nothing exported.");
        }
    }
    Ok(())
}
