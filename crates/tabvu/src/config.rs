//! YAML configuration: where the site lives, the personal access token
//! to sign in with, and the directory that owns the persisted stores.

use crate::TabvuError;
use crate::client::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TabvuConfig {
    /// Base server URL, e.g. `https://example.online.tableau.com`.
    pub server_url: String,
    /// The site's content URL; empty for the default site.
    #[serde(default)]
    pub site_content_url: String,
    pub token_name: String,
    pub token_secret: String,
    /// Directory holding `saved_queries.json` and `saved_schedules.json`.
    pub data_dir: PathBuf,
}

impl TabvuConfig {
    pub fn connection(&self) -> Connection {
        Connection {
            server_url: self.server_url.clone(),
            site_content_url: self.site_content_url.clone(),
            token_name: self.token_name.clone(),
            token_secret: self.token_secret.clone(),
        }
    }
}

/// Load configuration from a YAML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TabvuConfig, TabvuError> {
    let content = std::fs::read_to_string(&path).map_err(|e| {
        TabvuError::Validation(format!(
            "could not read config file {}: {e}",
            path.as_ref().display()
        ))
    })?;
    let config: TabvuConfig = serde_yaml_ng::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

pub(crate) fn validate_config(config: &TabvuConfig) -> Result<(), TabvuError> {
    if !config.server_url.starts_with("http://") && !config.server_url.starts_with("https://") {
        return Err(TabvuError::Validation(format!(
            "server_url must start with http:// or https://, got '{}'",
            config.server_url
        )));
    }
    if config.token_name.is_empty() {
        return Err(TabvuError::Validation("token_name cannot be empty".into()));
    }
    if config.token_secret.is_empty() {
        return Err(TabvuError::Validation("token_secret cannot be empty".into()));
    }
    if config.data_dir.as_os_str().is_empty() {
        return Err(TabvuError::Validation("data_dir cannot be empty".into()));
    }
    Ok(())
}

/// Write a starter configuration the user fills in. Refuses to clobber
/// an existing file.
pub fn write_example_config<P: AsRef<Path>>(path: P) -> Result<(), TabvuError> {
    let path = path.as_ref();
    if path.exists() {
        return Err(TabvuError::Validation(format!(
            "{} already exists",
            path.display()
        )));
    }
    let example = TabvuConfig {
        server_url: "https://your-cluster.online.tableau.com".into(),
        site_content_url: "your-site".into(),
        token_name: "your-token-name".into(),
        token_secret: "your-token-secret".into(),
        data_dir: PathBuf::from(".tabvu"),
    };
    let content = serde_yaml_ng::to_string(&example)?;
    std::fs::write(path, content)?;
    Ok(())
}
