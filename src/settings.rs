use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::session::{DEFAULT_COUNTDOWN_SECONDS, DEFAULT_RPE};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const DATA_DIR_ENV: &str = "DRILLRUN_DATA_DIR";
pub const FAST_MODE_ENV: &str = "DRILLRUN_FAST";
const FAST_TICK_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeSettings {
    pub countdown_seconds: u8,
    pub hold_to_end_ms: u64,
    pub tick_interval_ms: u64,
    pub default_rpe: u8,
    pub default_drill_minutes: u32,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            hold_to_end_ms: 1000,
            tick_interval_ms: 1000,
            default_rpe: DEFAULT_RPE,
            default_drill_minutes: 10,
        }
    }
}

impl RuntimeSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn hold_threshold(&self) -> Duration {
        Duration::from_millis(self.hold_to_end_ms)
    }

    /// Applies `DRILLRUN_FAST`, which speeds the drill clock up for demos.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = env::var(FAST_MODE_ENV) {
            if is_truthy(&value) {
                log_info!("{FAST_MODE_ENV} set; ticking every {FAST_TICK_INTERVAL_MS} ms");
                self.tick_interval_ms = FAST_TICK_INTERVAL_MS;
            }
        }
        self
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true")
}

/// Where settings and the session store live.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    ProjectDirs::from("", "", "drillrun")
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".drillrun"))
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<RuntimeSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!("Ignoring unreadable settings at {}: {err}", path.display());
                RuntimeSettings::default()
            })
        } else {
            RuntimeSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn runtime(&self) -> RuntimeSettings {
        self.read().clone()
    }

    pub fn update_runtime(&self, settings: RuntimeSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: RuntimeSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings at {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &RuntimeSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, RuntimeSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, RuntimeSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
