// Process-wide audio session policy
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{KeepAliveError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionCategory {
    Ambient,
    SoloAmbient,
    #[default]
    Playback,
    Record,
    PlayAndRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Default,
    SpokenAudio,
    MoviePlayback,
}

/// Category options; only the ones the keep-alive signal cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryOptions {
    #[serde(default)]
    pub mix_with_others: bool,
    #[serde(default)]
    pub duck_others: bool,
}

impl CategoryOptions {
    pub const MIX_WITH_OTHERS: Self = Self {
        mix_with_others: true,
        duck_others: false,
    };
}

/// Global mixing policy of the host process.
pub trait AudioSession: Send + Sync {
    fn set_category(&self, category: SessionCategory, mode: SessionMode, options: CategoryOptions) -> Result<()>;

    fn set_active(&self, active: bool) -> Result<()>;
}

/// Snapshot of what has been requested from the session so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionPolicy {
    pub category: SessionCategory,
    pub mode: SessionMode,
    pub options: CategoryOptions,
    pub active: bool,
}

/// In-process session record for hosts without a platform audio session.
///
/// Applies the same category/option compatibility rules a mobile audio
/// session enforces, so misconfigured settings fail the same way.
#[derive(Debug, Default)]
pub struct ProcessAudioSession {
    policy: Mutex<SessionPolicy>,
}

impl ProcessAudioSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(&self) -> SessionPolicy {
        *self.policy.lock()
    }
}

impl AudioSession for ProcessAudioSession {
    fn set_category(&self, category: SessionCategory, mode: SessionMode, options: CategoryOptions) -> Result<()> {
        let mixes = options.mix_with_others || options.duck_others;
        if mixes && !matches!(category, SessionCategory::Playback | SessionCategory::PlayAndRecord) {
            return Err(KeepAliveError::AudioSessionConfigFailed(format!(
                "mixing options are not supported by the {category:?} category"
            )));
        }

        let mut policy = self.policy.lock();
        policy.category = category;
        policy.mode = mode;
        policy.options = options;
        Ok(())
    }

    fn set_active(&self, active: bool) -> Result<()> {
        self.policy.lock().active = active;
        Ok(())
    }
}
