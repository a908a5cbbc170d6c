use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    Idle,
    Active,
}

impl SessionPhase {
    pub fn is_active(self) -> bool {
        self == SessionPhase::Active
    }
}

/// Controller-owned state. The countdown itself lives in the shared
/// [`CountdownStore`](crate::countdown::CountdownStore).
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    pub phase: SessionPhase,
    /// Last playback flag confirmed by the device.
    pub playing: bool,
    pub unmounted: bool,
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&mut self) {
        self.phase = SessionPhase::Active;
        self.playing = true;
    }

    pub fn deactivate(&mut self, still_playing: bool) {
        self.phase = SessionPhase::Idle;
        self.playing = still_playing;
    }
}
