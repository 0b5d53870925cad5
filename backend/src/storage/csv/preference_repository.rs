//! # YAML Preference Repository
//!
//! One YAML file per preference key under `preferences/` in the data
//! directory:
//!
//! ```yaml
//! value: dark
//! updated_at: "2025-08-01T19:35:00Z"
//! ```
//!
//! A missing or unreadable file yields the default value. Writes use the same
//! temp file + rename pattern as the movement files.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

use super::connection::CsvConnection;
use crate::domain::state::StateHolder;
use crate::storage::traits::PreferenceStore;

#[derive(Debug, Serialize, Deserialize)]
struct PreferenceFile<T> {
    value: T,
    updated_at: String,
}

/// A single preference persisted as `preferences/<key>.yaml`
pub struct YamlPreference<T> {
    path: PathBuf,
    state: StateHolder<T>,
}

impl<T> YamlPreference<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Open the preference `key`, loading its stored value or `default`
    pub fn open(connection: &CsvConnection, key: &str, default: T) -> Result<Self> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            bail!("Invalid preference key '{}'", key);
        }

        let path = connection
            .preferences_directory()
            .join(format!("{}.yaml", key));
        let initial = load_value(&path).unwrap_or(default);

        Ok(Self {
            path,
            state: StateHolder::new(initial),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, value: &T) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
                info!("Created preferences directory: {:?}", dir);
            }
        }

        let file = PreferenceFile {
            value,
            updated_at: Utc::now().to_rfc3339(),
        };
        let yaml_content = serde_yaml::to_string(&file)?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, yaml_content)?;
        fs::rename(&temp_path, &self.path)?;

        debug!("Saved preference to {:?}", self.path);
        Ok(())
    }
}

fn load_value<T: DeserializeOwned>(path: &Path) -> Option<T> {
    if !path.exists() {
        return None;
    }

    let parsed = fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|content| Ok(serde_yaml::from_str::<PreferenceFile<T>>(&content)?));

    match parsed {
        Ok(file) => {
            debug!("Loaded preference from {:?}", path);
            Some(file.value)
        }
        Err(e) => {
            warn!("Ignoring unreadable preference file {:?}: {}", path, e);
            None
        }
    }
}

#[async_trait]
impl<T> PreferenceStore<T> for YamlPreference<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn read(&self) -> watch::Receiver<T> {
        self.state.subscribe()
    }

    async fn write(&self, value: T) -> Result<()> {
        self.save(&value)?;
        self.state.set(value);
        Ok(())
    }
}
