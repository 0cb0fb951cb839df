//! Focus scoring and session accounting for a study timer.
//!
//! A [`SessionAccountant`] runs one study countdown at a time. While it runs,
//! a [`DistractionTracker`] counts app switches and, when a frame source is
//! attached, a [`FocusMonitor`] turns camera frames into [`FocusReading`]s.
//! Finished sessions are written to a [`SessionStore`], by default the SQLite
//! backed [`Database`].

pub mod analytics;
pub mod db;
pub mod distraction;
pub mod error;
pub mod models;
pub mod scoring;
pub mod sensing;
pub mod settings;
pub mod timer;
pub mod utils;

pub use analytics::{history_stats, load_stats, recent_history, SessionStats};
pub use db::{Database, SessionStore};
pub use distraction::{AppLifecycle, DistractionTracker, LifecycleHub, LifecycleSource};
pub use error::{ClassifierError, SessionError, StorageError};
pub use models::{DistractionEvent, DistractionKind, Emotion, FaceFrame, FocusReading, SessionRecord};
pub use scoring::{FocusScorer, ScoringConfig};
pub use sensing::{Classifier, FocusMonitor, FrameSlot, FrameSource, SignalExtractor};
pub use settings::{Settings, SettingsStore};
pub use timer::{AccountantConfig, SessionAccountant, SessionEvent, SessionSnapshot, SessionState};
pub use utils::init_logging;
