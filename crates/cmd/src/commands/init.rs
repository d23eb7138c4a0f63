use anyhow::{Context, Result};
use std::path::Path;

pub fn init_command(config_path: &Path) -> Result<()> {
    tabvu::config::write_example_config(config_path)
        .with_context(|| format!("could not write {}", config_path.display()))?;
    println!("Wrote starter configuration to {}", config_path.display());
    println!("Edit it with your server URL, site and personal access token.");
    Ok(())
}
