// Error types for the keep-alive controller and its collaborators

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, KeepAliveError>;

#[derive(Debug, Error)]
pub enum KeepAliveError {
    /// The silent asset could not be located through the registrar.
    #[error("could not find silent audio asset {asset} (looked in {path:?})")]
    AssetNotFound { asset: String, path: PathBuf },

    /// The playback device refused the resolved resource.
    #[error("could not create silent audio player for {path:?}: {reason}")]
    PlaybackConstructionFailed { path: PathBuf, reason: String },

    /// Setting the category or activating the audio session failed.
    #[error("error setting up audio session: {0}")]
    AudioSessionConfigFailed(String),

    #[error("settings: {0}")]
    Config(String),

    #[error("audio output: {0}")]
    Output(String),
}

impl KeepAliveError {
    /// True for failures that leave the session inactive.
    pub fn aborts_start(&self) -> bool {
        matches!(
            self,
            Self::AssetNotFound { .. } | Self::PlaybackConstructionFailed { .. }
        )
    }
}
