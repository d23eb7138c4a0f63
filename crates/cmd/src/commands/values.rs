use super::{connect, load_config};
use anyhow::Result;
use std::path::Path;

pub async fn values_command(config_path: &Path, datasource_luid: &str, field: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let client = connect(&config)?;

    let values = client.fetch_distinct_values(datasource_luid, field).await?;
    if values.is_empty() {
        println!("No values found for '{field}'.");
        return Ok(());
    }
    for value in &values {
        println!("{value}");
    }
    Ok(())
}
