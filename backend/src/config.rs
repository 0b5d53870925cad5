//! # Application Configuration
//!
//! `config.yaml` at the root of the data directory:
//!
//! ```yaml
//! data_directory: null        # set to relocate the data to another directory
//! default_owner: "user-1"     # owner used when a command omits --owner
//! history_pages: 3            # months loaded by `history` when --pages is omitted
//! ```
//!
//! The data directory itself comes from the command line, then the
//! `FINANCE_TRACKER_DATA_DIR` environment variable, then
//! `~/Documents/Finance Tracker`.

use anyhow::Result;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::csv::connection::default_data_directory;

pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const DATA_DIR_ENV: &str = "FINANCE_TRACKER_DATA_DIR";
pub const DEFAULT_HISTORY_PAGES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Redirect to a different data directory
    pub data_directory: Option<PathBuf>,
    pub default_owner: Option<String>,
    pub history_pages: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_directory: None,
            default_owner: None,
            history_pages: DEFAULT_HISTORY_PAGES,
        }
    }
}

impl AppConfig {
    pub fn path_in(data_directory: &Path) -> PathBuf {
        data_directory.join(CONFIG_FILE_NAME)
    }

    /// Load `config.yaml` from `data_directory`. A missing or invalid file
    /// yields the defaults.
    pub fn load_or_default(data_directory: &Path) -> Self {
        let config_path = Self::path_in(data_directory);
        if !config_path.exists() {
            debug!("No config file at {:?}, using defaults", config_path);
            return Self::default();
        }

        let parsed = fs::read_to_string(&config_path)
            .map_err(anyhow::Error::from)
            .and_then(|content| Ok(serde_yaml::from_str::<AppConfig>(&content)?));

        match parsed {
            Ok(config) => {
                debug!("Loaded config from {:?}", config_path);
                config
            }
            Err(e) => {
                warn!("Invalid config file {:?}: {}. Using defaults.", config_path, e);
                Self::default()
            }
        }
    }

    /// Save to `config.yaml` in `data_directory`
    pub fn save(&self, data_directory: &Path) -> Result<()> {
        if !data_directory.exists() {
            fs::create_dir_all(data_directory)?;
        }

        let config_path = Self::path_in(data_directory);
        let yaml_content = serde_yaml::to_string(self)?;

        // Use atomic write pattern: write to temp file, then rename
        let temp_path = config_path.with_extension("tmp");
        fs::write(&temp_path, yaml_content)?;
        fs::rename(&temp_path, &config_path)?;

        debug!("Saved config to {:?}", config_path);
        Ok(())
    }
}

/// Resolve the data directory from the command line flag, the environment and
/// finally the default location
pub fn resolve_data_directory(cli_flag: Option<PathBuf>) -> Result<PathBuf> {
    resolve_data_directory_from(cli_flag, std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
}

pub fn resolve_data_directory_from(
    cli_flag: Option<PathBuf>,
    env_value: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(dir) = cli_flag {
        debug!("Data directory from command line: {}", dir.display());
        return Ok(dir);
    }
    if let Some(dir) = env_value.filter(|dir| !dir.as_os_str().is_empty()) {
        debug!("Data directory from {}: {}", DATA_DIR_ENV, dir.display());
        return Ok(dir);
    }
    default_data_directory()
}

/// Follow the `data_directory` redirect of `config` if it points somewhere that exists
pub fn follow_redirect(data_directory: PathBuf, config: &AppConfig) -> PathBuf {
    match &config.data_directory {
        Some(target) if target == &data_directory => data_directory,
        Some(target) if target.exists() => {
            info!("Config redirects data directory to {}", target.display());
            target.clone()
        }
        Some(target) => {
            warn!(
                "Config redirects to non-existent directory {}. Using {}.",
                target.display(),
                data_directory.display()
            );
            data_directory
        }
        None => data_directory,
    }
}
