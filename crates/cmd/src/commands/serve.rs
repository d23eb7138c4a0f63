use super::{connect, load_config};
use anyhow::Result;
use chrono::Local;
use std::path::Path;
use std::sync::Arc;
use tabvu::{ExecutionPipeline, ScheduleStore, TriggerEngine};

/// The long-running mode: rebuild every persisted schedule into a live
/// trigger and keep firing them until interrupted. The schedule file is
/// the single source of truth; nothing about triggers is persisted.
pub async fn serve_command(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let client = connect(&config)?;

    // keep the cached credential fresh while we run unattended
    let refresh_timer = client.credentials().spawn_refresh_timer();

    let pipeline = Arc::new(ExecutionPipeline::new(Arc::new(client)));
    let engine = TriggerEngine::new(pipeline);

    let store = ScheduleStore::open(&config.data_dir)?;
    let created = engine.replay(store.schedules());
    println!(
        "Serving {created} of {} schedule(s). Press Ctrl-C to stop.",
        store.schedules().len()
    );

    let now = Local::now().naive_local();
    for schedule in store.schedules() {
        if engine.has_trigger(&schedule.name) {
            let next = schedule.cadence.next_fire_after(now, schedule.time);
            println!("  {}: {} at {}, next at {next}", schedule.name, schedule.cadence, schedule.time);
        } else {
            println!("  {}: could not be scheduled, see logs", schedule.name);
        }
    }

    tokio::signal::ctrl_c().await?;
    engine.shutdown();
    refresh_timer.abort();
    println!("Stopped.");
    Ok(())
}
