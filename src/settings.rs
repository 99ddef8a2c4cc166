use std::{fs, path::PathBuf, sync::Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils;

pub const AUTO_EXTRACT_KEY: &str = "autoExtract";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PopupSettings {
    #[serde(rename = "autoExtract")]
    pub auto_extract: bool,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("settings lock poisoned")]
    Poisoned,
}

/// Where the popup preference lives. Read once at open, written on toggle.
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    async fn load(&self) -> Result<PopupSettings, SettingsError>;
    async fn save(&self, settings: &PopupSettings) -> Result<(), SettingsError>;
}

/// Preference persisted as a small JSON document on disk.
pub struct JsonSettingsFile {
    path: PathBuf,
}

impl JsonSettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open_default() -> Self {
        Self::new(utils::settings_path())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl SettingsBackend for JsonSettingsFile {
    async fn load(&self) -> Result<PopupSettings, SettingsError> {
        read_settings(&self.path)
    }

    async fn save(&self, settings: &PopupSettings) -> Result<(), SettingsError> {
        write_settings(&self.path, settings)
    }
}

#[derive(Default)]
pub struct InMemorySettings {
    data: Mutex<PopupSettings>,
}

impl InMemorySettings {
    pub fn new(settings: PopupSettings) -> Self {
        Self {
            data: Mutex::new(settings),
        }
    }
}

#[async_trait]
impl SettingsBackend for InMemorySettings {
    async fn load(&self) -> Result<PopupSettings, SettingsError> {
        self.data
            .lock()
            .map(|guard| *guard)
            .map_err(|_| SettingsError::Poisoned)
    }

    async fn save(&self, settings: &PopupSettings) -> Result<(), SettingsError> {
        let mut guard = self.data.lock().map_err(|_| SettingsError::Poisoned)?;
        *guard = *settings;
        Ok(())
    }
}

fn read_settings(path: &PathBuf) -> Result<PopupSettings, SettingsError> {
    if !path.exists() {
        return Ok(PopupSettings::default());
    }
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn write_settings(path: &PathBuf, settings: &PopupSettings) -> Result<(), SettingsError> {
    utils::ensure_parent(path);
    let contents = serde_json::to_string_pretty(settings)?;
    fs::write(path, contents)?;
    Ok(())
}
