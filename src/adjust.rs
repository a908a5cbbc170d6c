use std::sync::Arc;

use crate::countdown::CountdownStore;
use crate::navigation::Navigator;
use crate::session::format_remaining;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationOption {
    pub label: &'static str,
    pub secs: u32,
}

pub static DURATION_OPTIONS: [DurationOption; 4] = [
    DurationOption {
        label: "10 seconds",
        secs: 10,
    },
    DurationOption {
        label: "5 minutes",
        secs: 5 * 60,
    },
    DurationOption {
        label: "10 minutes",
        secs: 10 * 60,
    },
    DurationOption {
        label: "15 minutes",
        secs: 15 * 60,
    },
];

/// The duration-adjustment modal: writes the chosen duration into the shared
/// countdown and navigates back to the session screen.
pub struct DurationPicker {
    countdown: CountdownStore,
    navigator: Arc<dyn Navigator>,
}

impl DurationPicker {
    pub fn new(countdown: CountdownStore, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            countdown,
            navigator,
        }
    }

    pub fn options(&self) -> &'static [DurationOption] {
        &DURATION_OPTIONS
    }

    pub fn current(&self) -> String {
        format_remaining(self.countdown.get())
    }

    pub fn confirm(&self, secs: u32) {
        log::info!("meditation duration set to {secs}s");
        self.countdown.set(secs);
        self.navigator.go_back();
    }

    /// Confirms the `choice`-th preset (1-based). Returns false if there is no
    /// such preset.
    pub fn pick(&self, choice: usize) -> bool {
        match choice.checked_sub(1).and_then(|index| DURATION_OPTIONS.get(index)) {
            Some(option) => {
                self.confirm(option.secs);
                true
            }
            None => false,
        }
    }
}
