use super::{connect, load_config};
use anyhow::{Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use tabvu::export::records_to_csv;
use tabvu::{ExecutionPipeline, ExportOutcome, QueryStore, QueryWorker, request};
use tokio::sync::oneshot;

pub async fn run_command(
    config_path: &Path,
    query_name: &str,
    out_dir: Option<&Path>,
    pattern: &str,
) -> Result<()> {
    let config = load_config(config_path)?;
    let store = QueryStore::open(&config.data_dir)?;
    let definition = store
        .get(query_name)
        .ok_or_else(|| anyhow!("no saved query named '{query_name}'"))?
        .clone();
    let client = connect(&config)?;

    match out_dir {
        Some(dir) => {
            let pipeline = ExecutionPipeline::new(Arc::new(client));
            match pipeline
                .execute_and_export(&definition, &definition.name, dir, pattern)
                .await?
            {
                ExportOutcome::Written { path, rows } => {
                    println!("Wrote {rows} rows to {}", path.display());
                }
                ExportOutcome::NoResults => {
                    println!("Query returned no results; nothing exported.");
                }
            }
        }
        None => {
            // foreground run: Ctrl-C cancels and suppresses the outcome
            let request = request::from_definition(&definition)?;
            let (sender, receiver) = oneshot::channel();
            let worker = QueryWorker::spawn(Arc::new(client), request, sender);

            tokio::select! {
                outcome = receiver => match outcome {
                    Ok(Ok(records)) => {
                        if records.is_empty() {
                            println!("Query returned no results.");
                        } else {
                            let csv = records_to_csv(&records)?;
                            print!("{}", String::from_utf8_lossy(&csv));
                        }
                    }
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_) => println!("Query cancelled."),
                },
                _ = tokio::signal::ctrl_c() => {
                    worker.cancel();
                    println!("Query cancelled.");
                }
            }
        }
    }
    Ok(())
}
