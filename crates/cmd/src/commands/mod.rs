use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;
use tabvu::{Client, TabvuConfig};

pub mod datasources;
pub mod fields;
pub mod init;
pub mod query;
pub mod run;
pub mod schedule;
pub mod serve;
pub mod values;

pub(crate) fn load_config(path: &Path) -> Result<TabvuConfig> {
    tabvu::config::load_config(path).with_context(|| {
        format!(
            "failed to load configuration from {} (run `tabvu init` to create one)",
            path.display()
        )
    })
}

pub(crate) fn connect(config: &TabvuConfig) -> Result<Client> {
    Client::new(config.connection()).context("failed to create API client")
}

/// Ask before a destructive action. `--yes` flags skip this.
pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}
