pub mod binaural;
pub mod brown_noise;
pub mod engine;
pub mod manager;
pub mod rain;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::SessionId;

pub use engine::RodioBackend;
pub use manager::{AudioResourceManager, SoundHandle};

/// Output rate shared by the procedural soundscapes.
pub const SAMPLE_RATE: u32 = 44_100;

/// What a catalog entry's audio name resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioAsset {
    BrownNoise,
    Rain,
    Binaural { left_hz: f32, right_hz: f32 },
    File { path: PathBuf },
}

/// Device-level playback behaviour requested once per screen activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioMode {
    pub plays_in_silent_mode: bool,
    pub stays_active_in_background: bool,
    pub duck_others: bool,
    pub play_through_earpiece: bool,
}

impl Default for AudioMode {
    fn default() -> Self {
        Self {
            plays_in_silent_mode: true,
            stays_active_in_background: true,
            duck_others: true,
            play_through_earpiece: false,
        }
    }
}

/// Identifies one loaded sound inside a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundId(pub u64);

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStatus {
    pub is_loaded: bool,
    pub is_playing: bool,
}

impl PlaybackStatus {
    pub fn unloaded() -> Self {
        Self::default()
    }
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no meditation with id {0}")]
    InvalidSession(SessionId),

    #[error("audio asset `{0}` is not bundled")]
    MissingAsset(String),

    #[error("{0} is not loaded")]
    NotLoaded(SoundId),

    #[error("audio for this screen has already been released")]
    Released,

    #[error("audio device error: {0}")]
    Device(String),

    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("audio engine is not running")]
    EngineUnavailable,
}

/// The device audio subsystem. Every call may suspend; callers must treat
/// results as possibly stale by the time they arrive.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    async fn configure(&self, mode: &AudioMode) -> Result<(), AudioError>;

    /// Loads `asset` in a paused state.
    async fn load(&self, asset: &AudioAsset, volume: f32) -> Result<SoundId, AudioError>;

    async fn play(&self, id: SoundId) -> Result<(), AudioError>;

    async fn pause(&self, id: SoundId) -> Result<(), AudioError>;

    async fn unload(&self, id: SoundId) -> Result<(), AudioError>;

    async fn status(&self, id: SoundId) -> Result<PlaybackStatus, AudioError>;
}
