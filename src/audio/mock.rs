//! Scripted in-memory backend for controller and manager tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{AudioAsset, AudioBackend, AudioError, AudioMode, PlaybackStatus, SoundId};

#[derive(Default)]
struct MockState {
    next_id: u64,
    sounds: HashMap<SoundId, bool>,
    loads: usize,
    plays: usize,
    pauses: usize,
    fail_configure: bool,
    fail_load: bool,
    fail_play: bool,
    fail_pause: bool,
}

#[derive(Default)]
pub(crate) struct MockBackend {
    state: Mutex<MockState>,
    play_gate: Mutex<Option<Arc<Notify>>>,
    play_started: Notify,
}

impl MockBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn failing_configure() -> Arc<Self> {
        let backend = Self::default();
        backend.state.lock().unwrap().fail_configure = true;
        Arc::new(backend)
    }

    pub(crate) fn fail_load(&self, fail: bool) {
        self.state.lock().unwrap().fail_load = fail;
    }

    pub(crate) fn fail_play(&self, fail: bool) {
        self.state.lock().unwrap().fail_play = fail;
    }

    pub(crate) fn fail_pause(&self, fail: bool) {
        self.state.lock().unwrap().fail_pause = fail;
    }

    /// Makes the next `play` calls wait until the returned gate is notified.
    pub(crate) fn hold_play(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.play_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub(crate) async fn play_in_flight(&self) {
        self.play_started.notified().await;
    }

    /// Simulates the OS pausing playback behind the app's back.
    pub(crate) fn interrupt_all(&self) {
        for playing in self.state.lock().unwrap().sounds.values_mut() {
            *playing = false;
        }
    }

    pub(crate) fn loaded(&self) -> usize {
        self.state.lock().unwrap().sounds.len()
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.state.lock().unwrap().sounds.values().any(|playing| *playing)
    }

    pub(crate) fn loads(&self) -> usize {
        self.state.lock().unwrap().loads
    }

    pub(crate) fn plays(&self) -> usize {
        self.state.lock().unwrap().plays
    }

    pub(crate) fn pauses(&self) -> usize {
        self.state.lock().unwrap().pauses
    }
}

#[async_trait]
impl AudioBackend for MockBackend {
    async fn configure(&self, _mode: &AudioMode) -> Result<(), AudioError> {
        if self.state.lock().unwrap().fail_configure {
            return Err(AudioError::Device("permission denied".into()));
        }
        Ok(())
    }

    async fn load(&self, _asset: &AudioAsset, _volume: f32) -> Result<SoundId, AudioError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_load {
            return Err(AudioError::Device("no output device".into()));
        }
        state.next_id += 1;
        state.loads += 1;
        let id = SoundId(state.next_id);
        state.sounds.insert(id, false);
        Ok(id)
    }

    async fn play(&self, id: SoundId) -> Result<(), AudioError> {
        let gate = self.play_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.play_started.notify_one();
            gate.notified().await;
        }
        let mut state = self.state.lock().unwrap();
        if state.fail_play {
            return Err(AudioError::Device("playback rejected".into()));
        }
        state.plays += 1;
        match state.sounds.get_mut(&id) {
            Some(playing) => {
                *playing = true;
                Ok(())
            }
            None => Err(AudioError::NotLoaded(id)),
        }
    }

    async fn pause(&self, id: SoundId) -> Result<(), AudioError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_pause {
            return Err(AudioError::Device("pause rejected".into()));
        }
        state.pauses += 1;
        match state.sounds.get_mut(&id) {
            Some(playing) => {
                *playing = false;
                Ok(())
            }
            None => Err(AudioError::NotLoaded(id)),
        }
    }

    async fn unload(&self, id: SoundId) -> Result<(), AudioError> {
        match self.state.lock().unwrap().sounds.remove(&id) {
            Some(_) => Ok(()),
            None => Err(AudioError::NotLoaded(id)),
        }
    }

    async fn status(&self, id: SoundId) -> Result<PlaybackStatus, AudioError> {
        let state = self.state.lock().unwrap();
        Ok(match state.sounds.get(&id) {
            Some(playing) => PlaybackStatus {
                is_loaded: true,
                is_playing: *playing,
            },
            None => PlaybackStatus::unloaded(),
        })
    }
}
