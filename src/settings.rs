use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::timer::AccountantConfig;

pub const MIN_STUDY_MINS: u32 = 5;
pub const MAX_STUDY_MINS: u32 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub study_duration_mins: u32,
    pub alerts_enabled: bool,
    pub focus_interval_ms: u64,
    /// Sessions shown in history and stats.
    pub history_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            study_duration_mins: 25,
            alerts_enabled: true,
            focus_interval_ms: 3000,
            history_limit: 30,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_STUDY_MINS..=MAX_STUDY_MINS).contains(&self.study_duration_mins) {
            bail!(
                "study duration must be between {} and {} minutes, got {}",
                MIN_STUDY_MINS,
                MAX_STUDY_MINS,
                self.study_duration_mins
            );
        }
        if self.history_limit == 0 {
            bail!("history limit must be at least one session");
        }
        if self.focus_interval_ms == 0 {
            bail!("focus interval must be greater than zero");
        }
        Ok(())
    }

    pub fn planned_duration_sec(&self) -> u32 {
        self.study_duration_mins * 60
    }

    pub fn accountant_config(&self) -> AccountantConfig {
        AccountantConfig {
            focus_interval: Duration::from_millis(self.focus_interval_ms),
            alerts_enabled: self.alerts_enabled,
            ..AccountantConfig::default()
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    /// Load settings from `path`. A missing, unreadable-as-JSON or invalid
    /// file yields the defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            parse_or_default(&contents)
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> Settings {
        self.read().clone()
    }

    pub fn update(&self, settings: Settings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: Settings = serde_json::from_str(&contents)?;
        data.validate()?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn parse_or_default(contents: &str) -> Settings {
    match serde_json::from_str::<Settings>(contents) {
        Ok(settings) if settings.validate().is_ok() => settings,
        Ok(_) | Err(_) => {
            log::warn!("Ignoring invalid settings file, using defaults");
            Settings::default()
        }
    }
}
