use std::sync::Arc;

use tokio::sync::Mutex;

use crate::catalog::{Catalog, SessionId};

use super::{AudioBackend, AudioError, AudioMode, SoundId};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// A loaded sound bound to the session that requested it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundHandle {
    pub id: SoundId,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Empty,
    Loaded(SoundHandle),
    Released,
}

/// Owns the one sound of a mounted session screen.
///
/// The slot lock is held across `load` and `unload`, so an acquisition racing
/// a release either finishes first (and its sound gets released) or observes
/// `Released` and loads nothing.
pub struct AudioResourceManager {
    backend: Arc<dyn AudioBackend>,
    catalog: Arc<dyn Catalog>,
    volume: f32,
    slot: Mutex<Slot>,
}

impl AudioResourceManager {
    pub fn new(backend: Arc<dyn AudioBackend>, catalog: Arc<dyn Catalog>, volume: f32) -> Self {
        Self {
            backend,
            catalog,
            volume,
            slot: Mutex::new(Slot::Empty),
        }
    }

    pub async fn configure(&self, mode: &AudioMode) -> Result<(), AudioError> {
        self.backend.configure(mode).await
    }

    /// Loads the session's audio paused, or returns the sound already loaded.
    pub async fn acquire(&self, session_id: SessionId) -> Result<SoundHandle, AudioError> {
        let mut slot = self.slot.lock().await;
        match *slot {
            Slot::Loaded(handle) => return Ok(handle),
            Slot::Released => return Err(AudioError::Released),
            Slot::Empty => {}
        }

        let entry = self
            .catalog
            .entry(session_id)
            .ok_or(AudioError::InvalidSession(session_id))?;
        let asset = self
            .catalog
            .audio_asset(entry.audio)
            .ok_or_else(|| AudioError::MissingAsset(entry.audio.to_string()))?;

        log_info!("loading `{}` for meditation {}", entry.audio, session_id);
        let id = self.backend.load(&asset, self.volume).await?;
        let handle = SoundHandle { id, session_id };
        *slot = Slot::Loaded(handle);
        Ok(handle)
    }

    pub async fn current(&self) -> Option<SoundHandle> {
        match *self.slot.lock().await {
            Slot::Loaded(handle) => Some(handle),
            Slot::Empty | Slot::Released => None,
        }
    }

    pub async fn play(&self, handle: SoundHandle) -> Result<(), AudioError> {
        let status = self.backend.status(handle.id).await?;
        if !status.is_loaded {
            log_warn!("{} isn't loaded yet, not playing", handle.id);
            return Err(AudioError::NotLoaded(handle.id));
        }
        log_debug!("playing {}", handle.id);
        self.backend.play(handle.id).await
    }

    /// Pauses in place; a later `play` resumes from the same position.
    pub async fn pause(&self, handle: SoundHandle) -> Result<(), AudioError> {
        log_debug!("pausing {}", handle.id);
        self.backend.pause(handle.id).await
    }

    /// Asks the device rather than trusting local state, since the OS can
    /// pause playback on its own (calls, other apps).
    pub async fn query_playing(&self, handle: SoundHandle) -> Result<bool, AudioError> {
        Ok(self.backend.status(handle.id).await?.is_playing)
    }

    /// Unloads the held sound. The manager refuses new acquisitions afterwards.
    pub async fn release(&self) -> Result<(), AudioError> {
        let mut slot = self.slot.lock().await;
        let previous = std::mem::replace(&mut *slot, Slot::Released);
        if let Slot::Loaded(handle) = previous {
            log_info!("releasing {} of meditation {}", handle.id, handle.session_id);
            self.backend.unload(handle.id).await?;
        }
        Ok(())
    }
}
