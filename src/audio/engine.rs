use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tokio::sync::oneshot;

use super::binaural::BinauralBeats;
use super::brown_noise::BrownNoise;
use super::rain::RainSound;
use super::{AudioAsset, AudioBackend, AudioError, AudioMode, PlaybackStatus, SoundId};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

type Reply<T> = oneshot::Sender<Result<T, AudioError>>;

enum EngineCommand {
    Configure { mode: AudioMode, reply: Reply<()> },
    Load { asset: AudioAsset, volume: f32, reply: Reply<SoundId> },
    Play { id: SoundId, reply: Reply<()> },
    Pause { id: SoundId, reply: Reply<()> },
    Unload { id: SoundId, reply: Reply<()> },
    Status { id: SoundId, reply: Reply<PlaybackStatus> },
}

/// Device audio through rodio.
///
/// The output stream is not `Send`, so it lives on a dedicated thread that is
/// spawned on first use; requests cross over a channel and each carries a
/// oneshot for its reply.
#[derive(Clone, Default)]
pub struct RodioBackend {
    tx: Arc<Mutex<Option<Sender<EngineCommand>>>>,
}

impl RodioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_thread(&self) -> Result<Sender<EngineCommand>, AudioError> {
        let mut guard = self.tx.lock().map_err(|_| AudioError::EngineUnavailable)?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<EngineCommand>();
        thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || {
                let mut engine = Engine::default();
                while let Ok(cmd) = rx.recv() {
                    engine.dispatch(cmd);
                }
                log_debug!("audio engine thread exiting");
            })
            .map_err(|e| AudioError::Device(format!("failed to spawn audio thread: {e}")))?;

        *guard = Some(tx.clone());
        Ok(tx)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> EngineCommand,
    ) -> Result<T, AudioError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.ensure_thread()?
            .send(build(reply_tx))
            .map_err(|_| AudioError::EngineUnavailable)?;
        reply_rx.await.map_err(|_| AudioError::EngineUnavailable)?
    }
}

#[async_trait]
impl AudioBackend for RodioBackend {
    async fn configure(&self, mode: &AudioMode) -> Result<(), AudioError> {
        let mode = mode.clone();
        self.request(|reply| EngineCommand::Configure { mode, reply })
            .await
    }

    async fn load(&self, asset: &AudioAsset, volume: f32) -> Result<SoundId, AudioError> {
        let asset = asset.clone();
        self.request(|reply| EngineCommand::Load {
            asset,
            volume,
            reply,
        })
        .await
    }

    async fn play(&self, id: SoundId) -> Result<(), AudioError> {
        self.request(|reply| EngineCommand::Play { id, reply }).await
    }

    async fn pause(&self, id: SoundId) -> Result<(), AudioError> {
        self.request(|reply| EngineCommand::Pause { id, reply }).await
    }

    async fn unload(&self, id: SoundId) -> Result<(), AudioError> {
        self.request(|reply| EngineCommand::Unload { id, reply })
            .await
    }

    async fn status(&self, id: SoundId) -> Result<PlaybackStatus, AudioError> {
        self.request(|reply| EngineCommand::Status { id, reply })
            .await
    }
}

/// State owned by the audio thread.
#[derive(Default)]
struct Engine {
    _stream: Option<OutputStream>,
    handle: Option<OutputStreamHandle>,
    sinks: HashMap<SoundId, Sink>,
    next_id: u64,
}

impl Engine {
    fn dispatch(&mut self, cmd: EngineCommand) {
        // A dropped reply receiver means the caller went away; nothing to do.
        match cmd {
            EngineCommand::Configure { mode, reply } => {
                let _ = reply.send(self.configure(&mode));
            }
            EngineCommand::Load {
                asset,
                volume,
                reply,
            } => {
                let _ = reply.send(self.load(&asset, volume));
            }
            EngineCommand::Play { id, reply } => {
                let _ = reply.send(self.with_sink(id, |sink| sink.play()));
            }
            EngineCommand::Pause { id, reply } => {
                let _ = reply.send(self.with_sink(id, |sink| sink.pause()));
            }
            EngineCommand::Unload { id, reply } => {
                let result = match self.sinks.remove(&id) {
                    Some(sink) => {
                        sink.stop();
                        log_debug!("unloaded {id}");
                        Ok(())
                    }
                    None => Err(AudioError::NotLoaded(id)),
                };
                let _ = reply.send(result);
            }
            EngineCommand::Status { id, reply } => {
                let status = match self.sinks.get(&id) {
                    Some(sink) => PlaybackStatus {
                        is_loaded: true,
                        is_playing: !sink.is_paused() && !sink.empty(),
                    },
                    None => PlaybackStatus::unloaded(),
                };
                let _ = reply.send(Ok(status));
            }
        }
    }

    fn ensure_output(&mut self) -> Result<&OutputStreamHandle, AudioError> {
        if self.handle.is_none() {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|e| AudioError::Device(format!("failed to open output stream: {e}")))?;
            self._stream = Some(stream);
            self.handle = Some(handle);
        }
        self.handle.as_ref().ok_or(AudioError::EngineUnavailable)
    }

    fn configure(&mut self, mode: &AudioMode) -> Result<(), AudioError> {
        self.ensure_output()?;
        // Desktop outputs have no silent switch, ducking or earpiece routing;
        // opening the stream is the whole of the configuration here.
        if mode.play_through_earpiece {
            log_warn!("earpiece routing is not supported on this platform");
        }
        log_info!("audio mode configured: {:?}", mode);
        Ok(())
    }

    fn load(&mut self, asset: &AudioAsset, volume: f32) -> Result<SoundId, AudioError> {
        let output = self.ensure_output()?;
        let sink = Sink::try_new(output)
            .map_err(|e| AudioError::Device(format!("failed to create audio sink: {e}")))?;
        sink.pause();
        sink.set_volume(volume.clamp(0.0, 1.0));

        match asset {
            AudioAsset::BrownNoise => sink.append(BrownNoise::new()),
            AudioAsset::Rain => sink.append(RainSound::new()),
            AudioAsset::Binaural { left_hz, right_hz } => {
                sink.append(BinauralBeats::new(*left_hz, *right_hz))
            }
            AudioAsset::File { path } => {
                let file = File::open(path).map_err(|e| AudioError::Decode {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                let decoder =
                    Decoder::new_looped(BufReader::new(file)).map_err(|e| AudioError::Decode {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                sink.append(decoder);
            }
        }

        self.next_id += 1;
        let id = SoundId(self.next_id);
        self.sinks.insert(id, sink);
        log_debug!("loaded {id} for {:?}", asset);
        Ok(id)
    }

    fn with_sink(&self, id: SoundId, op: impl FnOnce(&Sink)) -> Result<(), AudioError> {
        let sink = self.sinks.get(&id).ok_or(AudioError::NotLoaded(id))?;
        op(sink);
        Ok(())
    }
}
