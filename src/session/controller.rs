use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    audio::{AudioBackend, AudioMode, AudioResourceManager},
    catalog::{Catalog, SessionId},
    countdown::CountdownStore,
    navigation::{Navigator, Route},
};

use super::{format_remaining, ControllerState, Epoch, ScreenView, SessionPhase};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SessionEvent {
    StateChanged {
        session_id: SessionId,
        phase: SessionPhase,
        remaining_secs: u32,
        display: String,
        /// Playback flag last confirmed by the device.
        audio_playing: bool,
    },
    Completed {
        session_id: SessionId,
        completed_at: DateTime<Utc>,
    },
}

/// An async result came back after its screen was torn down or replaced.
#[derive(Debug, Error)]
#[error("screen generation {0} is no longer current")]
pub struct Superseded(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Halt,
}

/// Collaborators shared by every session screen the host mounts.
#[derive(Clone)]
pub struct SessionDeps {
    pub countdown: CountdownStore,
    pub backend: Arc<dyn AudioBackend>,
    pub catalog: Arc<dyn Catalog>,
    pub navigator: Arc<dyn Navigator>,
    pub epoch: Epoch,
    pub events: broadcast::Sender<SessionEvent>,
    pub audio_mode: AudioMode,
    pub volume: f32,
}

struct Ticker {
    token: CancellationToken,
    _handle: JoinHandle<()>,
}

/// Coordinates the countdown, the session's sound and the meditating flag
/// for one mounted session screen.
#[derive(Clone)]
pub struct SessionController {
    session_id: SessionId,
    instance_id: Uuid,
    generation: u64,
    state: Arc<Mutex<ControllerState>>,
    /// Serializes user operations and ticks.
    op_lock: Arc<Mutex<()>>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    tick_interval: Duration,
    audio: Arc<AudioResourceManager>,
    deps: SessionDeps,
}

impl SessionController {
    /// Mounts a screen for `session_id`. Audio mode failures are logged and
    /// otherwise ignored.
    pub async fn mount(deps: SessionDeps, session_id: SessionId) -> Self {
        let generation = deps.epoch.advance();
        let audio = Arc::new(AudioResourceManager::new(
            deps.backend.clone(),
            deps.catalog.clone(),
            deps.volume,
        ));

        let controller = Self {
            session_id,
            instance_id: Uuid::new_v4(),
            generation,
            state: Arc::new(Mutex::new(ControllerState::new())),
            op_lock: Arc::new(Mutex::new(())),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
            audio,
            deps,
        };

        log_info!(
            "mounting meditation {} (screen {}, generation {})",
            session_id,
            controller.instance_id,
            generation
        );

        if let Err(err) = controller.audio.configure(&controller.deps.audio_mode).await {
            log_error!("audio setup failed for meditation {}: {err}", session_id);
        }

        controller.emit_state_changed().await;
        controller
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.lock().await.phase
    }

    pub async fn view(&self) -> ScreenView {
        let phase = self.phase().await;
        ScreenView::new(
            self.deps.catalog.entry(self.session_id),
            self.deps.countdown.get(),
            phase,
        )
    }

    /// "Start Meditation" / "Stop". Failures are logged and leave the phase
    /// as it was.
    pub async fn toggle(&self) {
        let _op = self.op_lock.lock().await;
        if self.state.lock().await.unmounted {
            log_debug!("ignoring toggle on unmounted meditation {}", self.session_id);
            return;
        }
        let result = match self.phase().await {
            SessionPhase::Idle => self.start().await,
            SessionPhase::Active => self.stop(false).await,
        };
        self.report("toggle", result);
    }

    /// "Adjust Duration": stops an active session, then opens the picker.
    pub async fn adjust_duration(&self) {
        {
            let _op = self.op_lock.lock().await;
            let (unmounted, phase) = {
                let state = self.state.lock().await;
                (state.unmounted, state.phase)
            };
            if unmounted {
                log_debug!("ignoring adjust on unmounted meditation {}", self.session_id);
                return;
            }
            if phase.is_active() {
                let result = self.stop(true).await;
                self.report("stop before adjusting", result);
            }
        }
        if self.deps.epoch.is_current(self.generation) {
            self.deps.navigator.go_to(Route::AdjustDuration);
        }
    }

    pub fn go_back(&self) {
        self.deps.navigator.go_back();
    }

    /// Tears the screen down: cancels the ticker, resets the countdown and
    /// releases the sound. Runs the same way from either phase and does
    /// nothing the second time.
    pub async fn unmount(&self) {
        {
            let mut state = self.state.lock().await;
            if state.unmounted {
                return;
            }
            state.unmounted = true;
            state.deactivate(false);
        }

        // No `op_lock` here: an operation parked on a device call holds it
        // and has to observe the retired generation instead.
        let was_current = self.deps.epoch.retire(self.generation);
        self.cancel_ticker().await;
        // The countdown is shared with whichever screen superseded this one.
        if was_current {
            self.deps.countdown.reset();
        }

        if let Err(err) = self.audio.release().await {
            log_error!("failed to release audio for meditation {}: {err}", self.session_id);
        }
        log_info!("unmounted meditation {} (screen {})", self.session_id, self.instance_id);
    }

    /// One second of meditation. Called by the ticker; public so the host
    /// can drive the clock itself.
    pub async fn tick(&self) -> TickOutcome {
        self.tick_with(None).await
    }

    async fn tick_with(&self, token: Option<&CancellationToken>) -> TickOutcome {
        let _op = self.op_lock.lock().await;
        if token.is_some_and(|t| t.is_cancelled())
            || !self.deps.epoch.is_current(self.generation)
            || !self.phase().await.is_active()
        {
            return TickOutcome::Halt;
        }

        let remaining = self.deps.countdown.decrement();
        if remaining > 0 {
            self.emit_state_changed().await;
            return TickOutcome::Continue;
        }

        self.complete().await;
        TickOutcome::Halt
    }

    async fn start(&self) -> Result<()> {
        self.ensure_current()?;
        if self.deps.countdown.get() == 0 {
            self.deps.countdown.reset();
        }

        let handle = self.audio.acquire(self.session_id).await;
        self.ensure_current()?;
        let handle = handle?;

        let playing = self.audio.query_playing(handle).await;
        self.ensure_current()?;
        if !playing? {
            let played = self.audio.play(handle).await;
            self.ensure_current()?;
            played?;
        }

        self.state.lock().await.activate();
        self.spawn_ticker().await;
        log_info!(
            "meditation {} started with {}s remaining",
            self.session_id,
            self.deps.countdown.get()
        );
        self.emit_state_changed().await;
        Ok(())
    }

    /// With `force`, the session goes idle even if pausing fails.
    async fn stop(&self, force: bool) -> Result<()> {
        let paused = self.pause_audio().await;
        self.ensure_current()?;

        let still_playing = match paused {
            Ok(()) => false,
            Err(err) if force => {
                log_warn!("stopping meditation {} with audio still playing: {err:#}", self.session_id);
                true
            }
            Err(err) => return Err(err),
        };

        self.cancel_ticker().await;
        self.state.lock().await.deactivate(still_playing);
        log_info!(
            "meditation {} stopped with {}s remaining",
            self.session_id,
            self.deps.countdown.get()
        );
        self.emit_state_changed().await;
        Ok(())
    }

    async fn complete(&self) {
        let paused = self.pause_audio().await;
        if !self.deps.epoch.is_current(self.generation) {
            return;
        }
        if let Err(err) = &paused {
            log_error!("failed to pause audio at end of meditation {}: {err:#}", self.session_id);
        }

        self.state.lock().await.deactivate(paused.is_err());

        log_info!("meditation {} complete", self.session_id);
        self.emit_state_changed().await;
        let _ = self.deps.events.send(SessionEvent::Completed {
            session_id: self.session_id,
            completed_at: Utc::now(),
        });

        // Runs inside the ticker task, so this must stay the last await.
        self.cancel_ticker().await;
    }

    /// Pauses the sound if the device says it is playing.
    async fn pause_audio(&self) -> Result<()> {
        let Some(handle) = self.audio.current().await else {
            return Ok(());
        };
        if self.audio.query_playing(handle).await? {
            self.audio.pause(handle).await?;
        } else {
            log_debug!("{} already paused by the device", handle.id);
        }
        Ok(())
    }

    fn ensure_current(&self) -> Result<(), Superseded> {
        if self.deps.epoch.is_current(self.generation) {
            Ok(())
        } else {
            Err(Superseded(self.generation))
        }
    }

    fn report(&self, action: &str, result: Result<()>) {
        match result {
            Ok(()) => {}
            Err(err) if err.is::<Superseded>() => {
                log_info!("discarding {action} result for meditation {}: {err}", self.session_id);
            }
            Err(err) => {
                log_error!("{action} failed for meditation {}: {err:#}", self.session_id);
            }
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.token.cancel();
        }

        let token = CancellationToken::new();
        let task_token = token.clone();
        let controller = self.clone();
        let period = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if controller.tick_with(Some(&task_token)).await == TickOutcome::Halt {
                            break;
                        }
                    }
                    _ = task_token.cancelled() => break,
                }
            }
            log_debug!("ticker for meditation {} stopped", controller.session_id);
        });

        *ticker_guard = Some(Ticker {
            token,
            _handle: handle,
        });
    }

    async fn cancel_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.token.cancel();
        }
    }

    async fn emit_state_changed(&self) {
        let remaining_secs = self.deps.countdown.get();
        let (phase, audio_playing) = {
            let state = self.state.lock().await;
            (state.phase, state.playing)
        };
        let _ = self.deps.events.send(SessionEvent::StateChanged {
            session_id: self.session_id,
            phase,
            remaining_secs,
            display: format_remaining(remaining_secs),
            audio_playing,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjust::DurationPicker;
    use crate::audio::mock::MockBackend;
    use crate::catalog::BundledCatalog;
    use crate::navigation::{testing::RecordingNavigator, NavRequest};

    struct Harness {
        controller: SessionController,
        backend: Arc<MockBackend>,
        navigator: Arc<RecordingNavigator>,
        countdown: CountdownStore,
        events: broadcast::Receiver<SessionEvent>,
        deps: SessionDeps,
    }

    async fn mount_with(backend: Arc<MockBackend>, id: u32) -> Harness {
        let navigator = Arc::new(RecordingNavigator::default());
        let countdown = CountdownStore::new(10);
        let (events_tx, events) = broadcast::channel(64);
        let deps = SessionDeps {
            countdown: countdown.clone(),
            backend: backend.clone(),
            catalog: Arc::new(BundledCatalog::new()),
            navigator: navigator.clone(),
            epoch: Epoch::new(),
            events: events_tx,
            audio_mode: AudioMode::default(),
            volume: 1.0,
        };
        let controller = SessionController::mount(deps.clone(), SessionId(id)).await;
        Harness {
            controller,
            backend,
            navigator,
            countdown,
            events,
            deps,
        }
    }

    async fn mount(id: u32) -> Harness {
        mount_with(MockBackend::new(), id).await
    }

    fn last_state(events: &mut broadcast::Receiver<SessionEvent>) -> Option<(SessionPhase, bool)> {
        let mut last = None;
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::StateChanged {
                phase,
                audio_playing,
                ..
            } = event
            {
                last = Some((phase, audio_playing));
            }
        }
        last
    }

    fn completed(events: &mut broadcast::Receiver<SessionEvent>) -> bool {
        let mut seen = false;
        while let Ok(event) = events.try_recv() {
            seen |= matches!(event, SessionEvent::Completed { .. });
        }
        seen
    }

    #[tokio::test]
    async fn start_plays_audio_and_goes_active() {
        let mut h = mount(1).await;
        assert_eq!(h.controller.phase().await, SessionPhase::Idle);
        assert_eq!(last_state(&mut h.events), Some((SessionPhase::Idle, false)));

        h.controller.toggle().await;

        assert_eq!(h.controller.phase().await, SessionPhase::Active);
        assert!(h.backend.is_playing());
        assert_eq!(h.controller.view().await.toggle_label, "Stop");
        assert_eq!(last_state(&mut h.events), Some((SessionPhase::Active, true)));

        h.controller.toggle().await;
        assert_eq!(last_state(&mut h.events), Some((SessionPhase::Idle, false)));
    }

    #[tokio::test]
    async fn failed_play_leaves_the_session_idle() {
        let mut h = mount(3).await;
        h.countdown.set(30);
        h.backend.fail_play(true);

        h.controller.toggle().await;

        assert_eq!(h.controller.phase().await, SessionPhase::Idle);
        assert!(!h.backend.is_playing());
        assert_eq!(h.countdown.get(), 30);
        assert_eq!(last_state(&mut h.events), Some((SessionPhase::Idle, false)));

        // The loaded sound is reused once the device recovers.
        h.backend.fail_play(false);
        h.controller.toggle().await;
        assert_eq!(h.controller.phase().await, SessionPhase::Active);
        assert_eq!(h.backend.loads(), 1);
        assert_eq!(h.backend.plays(), 1);
    }

    #[tokio::test]
    async fn failed_load_leaves_the_session_idle() {
        let h = mount(4).await;
        h.backend.fail_load(true);

        h.controller.toggle().await;

        assert_eq!(h.controller.phase().await, SessionPhase::Idle);
        assert_eq!(h.backend.loaded(), 0);
        assert_eq!(h.backend.plays(), 0);
    }

    #[tokio::test]
    async fn second_toggle_stops() {
        let h = mount(1).await;

        h.controller.toggle().await;
        h.controller.toggle().await;

        assert_eq!(h.controller.phase().await, SessionPhase::Idle);
        assert!(!h.backend.is_playing());
        assert_eq!(h.backend.plays(), 1);
        assert_eq!(h.backend.pauses(), 1);
    }

    #[tokio::test]
    async fn concurrent_toggles_are_serialized() {
        let h = mount(2).await;

        tokio::join!(h.controller.toggle(), h.controller.toggle());

        assert_eq!(h.controller.phase().await, SessionPhase::Idle);
        assert_eq!(h.backend.plays(), 1);
        assert_eq!(h.backend.loads(), 1);
    }

    #[tokio::test]
    async fn starting_at_zero_resets_the_countdown() {
        let h = mount(1).await;
        h.countdown.set(0);

        h.controller.toggle().await;

        assert_eq!(h.countdown.get(), 10);
        assert_eq!(h.controller.phase().await, SessionPhase::Active);
    }

    #[tokio::test]
    async fn last_second_completes_the_session() {
        let mut h = mount(1).await;
        h.countdown.set(1);
        h.controller.toggle().await;

        assert_eq!(h.controller.tick().await, TickOutcome::Halt);

        assert_eq!(h.countdown.get(), 0);
        assert_eq!(h.controller.phase().await, SessionPhase::Idle);
        assert!(!h.backend.is_playing());
        assert!(completed(&mut h.events));
        assert_eq!(h.controller.view().await.time, "00:00");
    }

    #[tokio::test]
    async fn ticks_while_idle_change_nothing() {
        let h = mount(1).await;
        h.countdown.set(30);

        assert_eq!(h.controller.tick().await, TickOutcome::Halt);
        assert_eq!(h.countdown.get(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_counts_down_to_completion() {
        let mut h = mount(3).await;
        h.countdown.set(3);
        h.controller.toggle().await;

        time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(h.countdown.get(), 2);
        assert_eq!(h.controller.phase().await, SessionPhase::Active);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.countdown.get(), 0);
        assert_eq!(h.controller.phase().await, SessionPhase::Idle);
        assert!(!h.backend.is_playing());
        assert!(completed(&mut h.events));

        // Nothing keeps ticking below zero.
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.countdown.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_cancels_the_ticker() {
        let h = mount(1).await;
        h.countdown.set(5);
        h.controller.toggle().await;

        time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(h.countdown.get(), 3);

        h.controller.toggle().await;
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.countdown.get(), 3);

        // Resuming continues from where it stopped.
        h.controller.toggle().await;
        time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(h.countdown.get(), 2);
        assert_eq!(h.backend.loads(), 1);
    }

    #[tokio::test]
    async fn adjusting_mid_session_stops_and_hands_off() {
        let h = mount(1).await;
        h.countdown.set(42);
        h.controller.toggle().await;

        h.controller.adjust_duration().await;

        assert_eq!(h.controller.phase().await, SessionPhase::Idle);
        assert!(!h.backend.is_playing());
        assert_eq!(
            h.navigator.requests(),
            vec![NavRequest::GoTo(Route::AdjustDuration)]
        );

        let picker = DurationPicker::new(h.countdown.clone(), h.navigator.clone());
        picker.confirm(300);

        assert_eq!(h.countdown.get(), 300);
        assert_eq!(h.controller.phase().await, SessionPhase::Idle);
        assert_eq!(h.controller.view().await.time, "05:00");
    }

    #[tokio::test]
    async fn adjusting_while_idle_only_navigates() {
        let h = mount(1).await;

        h.controller.adjust_duration().await;

        assert_eq!(h.backend.pauses(), 0);
        assert_eq!(h.backend.loads(), 0);
        assert_eq!(
            h.navigator.requests(),
            vec![NavRequest::GoTo(Route::AdjustDuration)]
        );
    }

    #[tokio::test]
    async fn adjusting_forces_idle_even_if_pause_fails() {
        let h = mount(1).await;
        h.controller.toggle().await;
        h.backend.fail_pause(true);

        h.controller.toggle().await;
        assert_eq!(h.controller.phase().await, SessionPhase::Active);

        h.controller.adjust_duration().await;
        assert_eq!(h.controller.phase().await, SessionPhase::Idle);
    }

    #[tokio::test]
    async fn unknown_session_leaves_start_inert() {
        let h = mount(99).await;
        h.countdown.set(60);

        h.controller.toggle().await;

        assert_eq!(h.controller.phase().await, SessionPhase::Idle);
        assert_eq!(h.backend.loads(), 0);
        assert_eq!(h.countdown.get(), 60);
        assert_eq!(h.controller.view().await.title, None);
    }

    #[tokio::test]
    async fn audio_setup_failure_does_not_block_playback() {
        let h = mount_with(MockBackend::failing_configure(), 4).await;

        h.controller.toggle().await;

        assert_eq!(h.controller.phase().await, SessionPhase::Active);
        assert!(h.backend.is_playing());
    }

    #[tokio::test]
    async fn device_interruptions_are_respected() {
        let h = mount(5).await;
        h.controller.toggle().await;
        h.backend.interrupt_all();

        h.controller.toggle().await;
        assert_eq!(h.controller.phase().await, SessionPhase::Idle);
        assert_eq!(h.backend.pauses(), 0);

        h.controller.toggle().await;
        assert!(h.backend.is_playing());
        assert_eq!(h.backend.plays(), 2);
    }

    #[tokio::test]
    async fn unmount_resets_and_releases_once() {
        let h = mount(1).await;
        h.countdown.set(42);
        h.controller.toggle().await;

        h.controller.unmount().await;

        assert_eq!(h.countdown.get(), 10);
        assert_eq!(h.backend.loaded(), 0);
        assert_eq!(h.controller.phase().await, SessionPhase::Idle);

        h.countdown.set(77);
        h.controller.unmount().await;
        assert_eq!(h.countdown.get(), 77);

        // A dead screen can't be restarted.
        h.controller.toggle().await;
        assert_eq!(h.controller.phase().await, SessionPhase::Idle);
        assert_eq!(h.backend.loads(), 1);
    }

    #[tokio::test]
    async fn unmounted_screen_leaves_the_countdown_alone() {
        let h = mount(1).await;
        h.controller.unmount().await;
        h.countdown.set(0);

        h.controller.toggle().await;
        assert_eq!(h.countdown.get(), 0);

        h.controller.adjust_duration().await;
        assert_eq!(h.countdown.get(), 0);
        assert!(h.navigator.requests().is_empty());
        assert_eq!(h.backend.loads(), 0);
    }

    #[tokio::test]
    async fn unmount_while_play_is_in_flight_discards_the_result() {
        let h = mount(2).await;
        h.countdown.set(42);
        let gate = h.backend.hold_play();

        let controller = h.controller.clone();
        let pending = tokio::spawn(async move { controller.toggle().await });
        h.backend.play_in_flight().await;

        h.controller.unmount().await;
        gate.notify_one();
        pending.await.unwrap();

        assert_eq!(h.controller.phase().await, SessionPhase::Idle);
        assert_eq!(h.countdown.get(), 10);
        assert_eq!(h.backend.loaded(), 0);
        assert!(!h.backend.is_playing());
        assert!(h.navigator.requests().is_empty());
    }

    #[tokio::test]
    async fn superseded_screen_ignores_toggles() {
        let h = mount(1).await;
        let newer = SessionController::mount(h.deps.clone(), SessionId(2)).await;

        h.countdown.set(0);
        h.controller.toggle().await;
        assert_eq!(h.controller.phase().await, SessionPhase::Idle);
        assert_eq!(h.backend.loads(), 0);
        assert_eq!(h.countdown.get(), 0);

        newer.toggle().await;
        assert_eq!(newer.phase().await, SessionPhase::Active);

        // Tearing down the stale screen leaves the newer one running.
        h.countdown.set(42);
        h.controller.unmount().await;
        assert_eq!(newer.phase().await, SessionPhase::Active);
        assert_eq!(h.countdown.get(), 42);
        assert!(h.deps.epoch.is_current(newer.generation));
    }
}
