use serde::Serialize;

use crate::catalog::MeditationEntry;

use super::SessionPhase;

pub const ADJUST_LABEL: &str = "Adjust Duration";
pub const START_LABEL: &str = "Start Meditation";
pub const STOP_LABEL: &str = "Stop";

/// `mm:ss`, both parts zero-padded to two digits.
pub fn format_remaining(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Everything the session screen renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenView {
    pub title: Option<&'static str>,
    pub image: Option<&'static str>,
    pub time: String,
    pub phase: SessionPhase,
    pub adjust_label: &'static str,
    pub toggle_label: &'static str,
}

impl ScreenView {
    pub fn new(entry: Option<&MeditationEntry>, remaining_secs: u32, phase: SessionPhase) -> Self {
        Self {
            title: entry.map(|e| e.title),
            image: entry.map(|e| e.image),
            time: format_remaining(remaining_secs),
            phase,
            adjust_label: ADJUST_LABEL,
            toggle_label: if phase.is_active() { STOP_LABEL } else { START_LABEL },
        }
    }
}
