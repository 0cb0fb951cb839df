pub mod controller;
pub mod events;
pub mod state;

pub use controller::{AccountantConfig, SessionAccountant, SessionAccountantBuilder};
pub use events::{SessionEvent, SessionSnapshot};
pub use state::{FocusAggregate, SessionState, TimerState};
