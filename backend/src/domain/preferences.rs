//! User preferences: theme, language, text scale and the selected account.
//!
//! Each preference lives in its own injected [`PreferenceStore`], so the
//! service works the same over YAML files or in-memory stores.

use anyhow::{bail, Result};
use log::info;
use shared::{PreferencesSnapshot, ThemeMode};
use std::sync::Arc;
use tokio::sync::watch;

use crate::storage::csv::{CsvConnection, YamlPreference};
use crate::storage::traits::PreferenceStore;

pub const DEFAULT_LANGUAGE: &str = "es";
pub const DEFAULT_TEXT_SCALE: f32 = 1.0;
pub const MIN_TEXT_SCALE: f32 = 0.5;
pub const MAX_TEXT_SCALE: f32 = 2.0;

#[derive(Clone)]
pub struct PreferenceService {
    theme: Arc<dyn PreferenceStore<ThemeMode>>,
    language: Arc<dyn PreferenceStore<String>>,
    text_scale: Arc<dyn PreferenceStore<f32>>,
    selected_account: Arc<dyn PreferenceStore<Option<String>>>,
}

impl PreferenceService {
    pub fn new(
        theme: Arc<dyn PreferenceStore<ThemeMode>>,
        language: Arc<dyn PreferenceStore<String>>,
        text_scale: Arc<dyn PreferenceStore<f32>>,
        selected_account: Arc<dyn PreferenceStore<Option<String>>>,
    ) -> Self {
        Self {
            theme,
            language,
            text_scale,
            selected_account,
        }
    }

    /// Preferences stored as YAML files in the connection's data directory
    pub fn from_connection(connection: &CsvConnection) -> Result<Self> {
        Ok(Self::new(
            Arc::new(YamlPreference::open(connection, "theme", ThemeMode::default())?),
            Arc::new(YamlPreference::open(
                connection,
                "language",
                DEFAULT_LANGUAGE.to_string(),
            )?),
            Arc::new(YamlPreference::open(connection, "text_scale", DEFAULT_TEXT_SCALE)?),
            Arc::new(YamlPreference::<Option<String>>::open(
                connection,
                "selected_account",
                None,
            )?),
        ))
    }

    pub fn theme(&self) -> ThemeMode {
        *self.theme.read().borrow()
    }

    pub fn subscribe_theme(&self) -> watch::Receiver<ThemeMode> {
        self.theme.read()
    }

    pub async fn set_theme(&self, theme: ThemeMode) -> Result<()> {
        self.theme.write(theme).await?;
        info!("Theme set to {:?}", theme);
        Ok(())
    }

    pub fn language(&self) -> String {
        self.language.read().borrow().clone()
    }

    pub fn subscribe_language(&self) -> watch::Receiver<String> {
        self.language.read()
    }

    /// Set the UI language from a BCP-47 tag such as `es` or `en-GB`
    pub async fn set_language(&self, tag: &str) -> Result<()> {
        let tag = tag.trim();
        if !is_language_tag(tag) {
            bail!("'{}' is not a valid language tag", tag);
        }
        self.language.write(tag.to_string()).await?;
        info!("Language set to {}", tag);
        Ok(())
    }

    pub fn text_scale(&self) -> f32 {
        *self.text_scale.read().borrow()
    }

    pub fn subscribe_text_scale(&self) -> watch::Receiver<f32> {
        self.text_scale.read()
    }

    /// Store the text scale clamped to the supported range; returns the stored value
    pub async fn set_text_scale(&self, scale: f32) -> Result<f32> {
        if !scale.is_finite() {
            bail!("Text scale must be a finite number");
        }
        let clamped = scale.clamp(MIN_TEXT_SCALE, MAX_TEXT_SCALE);
        self.text_scale.write(clamped).await?;
        info!("Text scale set to {}", clamped);
        Ok(clamped)
    }

    pub fn selected_account(&self) -> Option<String> {
        self.selected_account.read().borrow().clone()
    }

    pub fn subscribe_selected_account(&self) -> watch::Receiver<Option<String>> {
        self.selected_account.read()
    }

    /// Select an account; a blank ID clears the selection
    pub async fn set_selected_account(&self, account_id: Option<&str>) -> Result<()> {
        let account = account_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        self.selected_account.write(account.clone()).await?;
        info!("Selected account set to {:?}", account);
        Ok(())
    }

    pub fn snapshot(&self) -> PreferencesSnapshot {
        PreferencesSnapshot {
            theme: self.theme(),
            language: self.language(),
            text_scale: self.text_scale(),
            selected_account: self.selected_account(),
        }
    }
}

/// Loose BCP-47 check: a 2-3 letter primary language, then alphanumeric subtags
fn is_language_tag(tag: &str) -> bool {
    let mut parts = tag.split('-');
    let primary_ok = parts
        .next()
        .map(|p| (2..=3).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false);

    primary_ok
        && parts.all(|p| (1..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()))
}
