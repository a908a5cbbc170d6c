use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::{broadcast, mpsc};

use crate::{
    adjust::DurationPicker,
    audio::AudioBackend,
    catalog::Catalog,
    countdown::CountdownStore,
    navigation::{ChannelNavigator, NavRequest, Navigator, Route},
    session::{commands::HELP, Epoch, ScreenCommand, SessionController, SessionDeps, SessionEvent},
    settings::MeditationSettings,
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Meditate,
    AdjustDuration,
}

/// Stands in for the app's router: keeps the screen stack, mounts a session
/// controller when a meditation is opened and unmounts it when it is left.
pub struct MeditationApp {
    deps: SessionDeps,
    picker: DurationPicker,
    nav_rx: mpsc::UnboundedReceiver<NavRequest>,
    stack: Vec<Screen>,
    session: Option<SessionController>,
    quit: bool,
}

impl MeditationApp {
    pub fn new(
        settings: &MeditationSettings,
        backend: Arc<dyn AudioBackend>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        let countdown = CountdownStore::new(settings.default_duration_secs);
        let (navigator, nav_rx) = ChannelNavigator::new();
        let navigator: Arc<dyn Navigator> = Arc::new(navigator);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            picker: DurationPicker::new(countdown.clone(), navigator.clone()),
            deps: SessionDeps {
                countdown,
                backend,
                catalog,
                navigator,
                epoch: Epoch::new(),
                events,
                audio_mode: settings.audio_mode.clone(),
                volume: settings.volume,
            },
            nav_rx,
            stack: vec![Screen::Home],
            session: None,
            quit: false,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.deps.events.subscribe()
    }

    pub fn countdown(&self) -> &CountdownStore {
        &self.deps.countdown
    }

    pub fn screen(&self) -> Screen {
        self.stack.last().copied().unwrap_or(Screen::Home)
    }

    pub fn session(&self) -> Option<&SessionController> {
        self.session.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Runs one user command, then applies whatever navigation it requested.
    /// Returns extra text to show the user, if any.
    pub async fn handle(&mut self, command: ScreenCommand) -> Result<Option<String>> {
        let output = self.dispatch(command).await;
        self.settle().await;
        output
    }

    async fn dispatch(&mut self, command: ScreenCommand) -> Result<Option<String>> {
        match (command, self.screen()) {
            (ScreenCommand::Help, _) => return Ok(Some(HELP.to_string())),
            (ScreenCommand::List, _) => return Ok(Some(self.render_catalog())),
            (ScreenCommand::Show, _) => {}
            (ScreenCommand::Quit, _) => self.quit = true,
            (ScreenCommand::Open(id), _) => self.deps.navigator.go_to(Route::Meditate(id)),
            (ScreenCommand::Toggle, Screen::Meditate) => self.active_session()?.toggle().await,
            (ScreenCommand::Adjust, Screen::Meditate) => {
                self.active_session()?.adjust_duration().await
            }
            (ScreenCommand::Back, Screen::Meditate) => self.active_session()?.go_back(),
            (ScreenCommand::Back, _) => self.deps.navigator.go_back(),
            (ScreenCommand::Set(secs), Screen::AdjustDuration) => self.picker.confirm(secs),
            (ScreenCommand::Pick(choice), Screen::AdjustDuration) => {
                if !self.picker.pick(choice) {
                    bail!("no preset {choice}");
                }
            }
            (command, screen) => bail!("{command:?} isn't available on the {screen:?} screen"),
        }
        Ok(None)
    }

    fn active_session(&self) -> Result<SessionController> {
        match &self.session {
            Some(session) => Ok(session.clone()),
            None => bail!("no meditation is open"),
        }
    }

    /// Applies queued navigation requests.
    pub async fn settle(&mut self) {
        while let Ok(request) = self.nav_rx.try_recv() {
            self.navigate(request).await;
        }
    }

    async fn navigate(&mut self, request: NavRequest) {
        log::debug!("navigating: {:?}", request);
        match request {
            NavRequest::GoTo(Route::Home) => {
                self.close_session().await;
                self.stack = vec![Screen::Home];
            }
            NavRequest::GoTo(Route::Meditate(id)) => {
                self.close_session().await;
                self.session = Some(SessionController::mount(self.deps.clone(), id).await);
                self.stack = vec![Screen::Home, Screen::Meditate];
            }
            NavRequest::GoTo(Route::AdjustDuration) => {
                self.stack.push(Screen::AdjustDuration);
            }
            NavRequest::Back => match self.stack.pop() {
                Some(Screen::Meditate) => self.close_session().await,
                Some(Screen::Home) | None => self.stack = vec![Screen::Home],
                Some(Screen::AdjustDuration) => {}
            },
        }
    }

    async fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.unmount().await;
        }
    }

    pub async fn shutdown(&mut self) {
        self.close_session().await;
        self.stack = vec![Screen::Home];
    }

    pub async fn render(&self) -> String {
        match (self.screen(), &self.session) {
            (Screen::Meditate, Some(session)) => {
                let view = session.view().await;
                format!(
                    "{} [{}]\n  ({})  ({})",
                    view.title.unwrap_or("Unknown meditation"),
                    view.time,
                    view.adjust_label,
                    view.toggle_label
                )
            }
            (Screen::AdjustDuration, _) => {
                let mut out = format!("Adjust duration (now {})\n", self.picker.current());
                for (n, option) in self.picker.options().iter().enumerate() {
                    let _ = writeln!(out, "  {}. {}", n + 1, option.label);
                }
                out.push_str("  `pick <n>` or `set <secs>`");
                out
            }
            _ => self.render_catalog(),
        }
    }

    fn render_catalog(&self) -> String {
        let mut out = String::from("Meditations:");
        for entry in self.deps.catalog.entries() {
            let _ = write!(out, "\n  {}. {}", entry.id, entry.title);
        }
        out
    }
}
