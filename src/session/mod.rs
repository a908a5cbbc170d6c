pub mod commands;
pub mod controller;
pub mod epoch;
pub mod state;
pub mod view;

pub use commands::ScreenCommand;
pub use controller::{SessionController, SessionDeps, SessionEvent, Superseded, TickOutcome};
pub use epoch::Epoch;
pub use state::{ControllerState, SessionPhase};
pub use view::{format_remaining, ScreenView};
