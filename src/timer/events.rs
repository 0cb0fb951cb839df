use serde::Serialize;

use crate::models::{DistractionKind, FocusReading, SessionRecord};

use super::SessionState;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub session_id: Option<i64>,
    pub planned_duration_sec: u32,
    pub remaining_sec: u32,
    pub distraction_count: u32,
    pub focus_score: u8,
    pub latest_reading: Option<FocusReading>,
}

/// Notifications for whoever renders the session.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    StateChanged(SessionSnapshot),
    Heartbeat { remaining_sec: u32 },
    FocusUpdated(FocusReading),
    /// First alert of a reading, only when alerts are enabled.
    AlertRaised { message: String },
    Distraction { kind: DistractionKind, count: u32 },
    /// Countdown reached zero and the record was saved.
    Completed(SessionRecord),
    /// Session ended early and the partial record was saved.
    Abandoned(SessionRecord),
    /// Saving the final record failed; the session is back to NotStarted.
    SaveFailed { session_id: i64, message: String },
}
