use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::audio::AudioMode;
use crate::countdown::DEFAULT_DURATION_SECS;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeditationSettings {
    /// Countdown value at startup and after a session ends or is abandoned.
    pub default_duration_secs: u32,
    pub volume: f32,
    pub audio_mode: AudioMode,
    /// Rebinds bundled audio names (e.g. `rain`) to files on disk.
    pub audio_overrides: HashMap<String, PathBuf>,
}

impl Default for MeditationSettings {
    fn default() -> Self {
        Self {
            default_duration_secs: DEFAULT_DURATION_SECS,
            volume: 1.0,
            audio_mode: AudioMode::default(),
            audio_overrides: HashMap::new(),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<MeditationSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring unreadable settings in {}: {err}", path.display());
                MeditationSettings::default()
            })
        } else {
            MeditationSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> MeditationSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: MeditationSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: MeditationSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings in {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &MeditationSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    // Settings are replaced wholesale, so a poisoned lock still holds
    // consistent data.
    fn read(&self) -> RwLockReadGuard<'_, MeditationSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MeditationSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
