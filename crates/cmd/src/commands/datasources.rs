use super::{connect, load_config};
use anyhow::Result;
use std::path::Path;

pub async fn datasources_command(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let client = connect(&config)?;

    let datasources = client.list_datasources().await?;
    if datasources.is_empty() {
        println!("No datasources found on this site.");
        return Ok(());
    }

    println!("{} datasources:", datasources.len());
    for datasource in &datasources {
        println!("  {}  {}", datasource.luid, datasource.name);
    }
    Ok(())
}
