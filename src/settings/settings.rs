// Keep-alive settings and persistence
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{KeepAliveError, Result};
use crate::platform::{CategoryOptions, SessionCategory, SessionMode};

/// Volume used when the configured one is unusable.
pub const DEFAULT_VOLUME: f32 = 0.01;

/// Audio session policy requested before every emission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub category: SessionCategory,
    pub mode: SessionMode,
    pub options: CategoryOptions,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            category: SessionCategory::Playback,
            mode: SessionMode::Default,
            options: CategoryOptions::MIX_WITH_OTHERS,
        }
    }
}

/// Keep-alive settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepAliveSettings {
    pub version: i32, // Settings schema version for future migrations
    pub asset: String,
    pub package: String,
    pub period_ms: u64,
    pub volume: f32,
    pub number_of_loops: u32,
    pub session: SessionSettings,
}

impl Default for KeepAliveSettings {
    fn default() -> Self {
        Self {
            version: 1,
            asset: "assets/blank.mp3".to_string(),
            package: "alarm".to_string(),
            period_ms: 10_000,
            volume: DEFAULT_VOLUME,
            number_of_loops: 0,
            session: SessionSettings::default(),
        }
    }
}

impl KeepAliveSettings {
    /// Get the settings file path
    pub fn get_settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join("keepalive.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = Self::get_settings_path(app_dir);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no keep-alive settings file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| KeepAliveError::Config(format!("failed to read {}: {e}", path.display())))?;

        let settings: KeepAliveSettings = serde_json::from_str(&content)
            .map_err(|e| KeepAliveError::Config(format!("failed to parse {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "loaded keep-alive settings");
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        fs::create_dir_all(app_dir)
            .map_err(|e| KeepAliveError::Config(format!("failed to create {}: {e}", app_dir.display())))?;

        let path = Self::get_settings_path(app_dir);
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| KeepAliveError::Config(format!("failed to serialize settings: {e}")))?;

        fs::write(&path, content)
            .map_err(|e| KeepAliveError::Config(format!("failed to write {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "saved keep-alive settings");
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.max(1))
    }

    /// Near-silent but never muted: a zero volume would not count as playing.
    pub fn effective_volume(&self) -> f32 {
        if self.volume.is_finite() && self.volume > 0.0 {
            self.volume.min(1.0)
        } else {
            DEFAULT_VOLUME
        }
    }
}
