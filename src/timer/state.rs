use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::models::FocusReading;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    NotStarted,
    Running,
    Paused,
    Completed,
}

/// Running mean of the focus scores accepted during a session. Only the
/// latest reading itself is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocusAggregate {
    sum: u64,
    count: u32,
}

impl FocusAggregate {
    pub fn record(&mut self, score: u8) {
        self.sum += u64::from(score);
        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Rounded mean, 100 when nothing was recorded.
    pub fn score(&self) -> u8 {
        if self.count == 0 {
            return 100;
        }
        let mean = (self.sum as f64 / f64::from(self.count)).round();
        mean.clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone)]
pub struct TimerState {
    pub status: SessionState,
    pub session_id: Option<i64>,
    pub planned_ms: u64,
    pub active_ms: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub focus: FocusAggregate,
    pub latest_reading: Option<FocusReading>,
    /// Set when the session completes; the tracker owns the live count.
    pub final_distractions: Option<u32>,
    /// Time accumulated from earlier running windows; combines with
    /// `running_anchor` to compute the true active duration.
    active_ms_baseline: u64,
    running_anchor: Option<Instant>,
}

impl TimerState {
    pub fn new(planned_ms: u64) -> Self {
        Self {
            status: SessionState::NotStarted,
            session_id: None,
            planned_ms,
            active_ms: 0,
            started_at: None,
            focus: FocusAggregate::default(),
            latest_reading: None,
            final_distractions: None,
            active_ms_baseline: 0,
            running_anchor: None,
        }
    }

    pub fn remaining_ms(&self) -> u64 {
        match self.status {
            SessionState::NotStarted => self.planned_ms,
            SessionState::Running | SessionState::Paused => {
                self.planned_ms.saturating_sub(self.current_active_ms())
            }
            SessionState::Completed => 0,
        }
    }

    pub fn current_active_ms(&self) -> u64 {
        if let (SessionState::Running, Some(anchor)) = (self.status, self.running_anchor) {
            self.active_ms_baseline
                .saturating_add(anchor.elapsed().as_millis() as u64)
        } else {
            self.active_ms
        }
    }

    pub fn sync_active_from_anchor(&mut self) {
        if let (SessionState::Running, Some(anchor)) = (self.status, self.running_anchor) {
            self.active_ms = self
                .active_ms_baseline
                .saturating_add(anchor.elapsed().as_millis() as u64);
        }
    }

    pub fn begin_session(&mut self, session_id: i64, start_at: DateTime<Utc>, now: Instant) {
        *self = Self {
            status: SessionState::Running,
            session_id: Some(session_id),
            started_at: Some(start_at),
            running_anchor: Some(now),
            ..Self::new(self.planned_ms)
        };
    }

    pub fn pause(&mut self) {
        self.sync_active_from_anchor();
        self.status = SessionState::Paused;
        self.running_anchor = None;
        self.active_ms_baseline = self.active_ms;
    }

    pub fn resume(&mut self, now: Instant) {
        self.status = SessionState::Running;
        self.active_ms_baseline = self.active_ms;
        self.running_anchor = Some(now);
    }

    /// The final distraction count is filled in once the tracker has stopped.
    pub fn complete(&mut self) {
        self.sync_active_from_anchor();
        self.status = SessionState::Completed;
        self.running_anchor = None;
        self.active_ms = self.planned_ms;
        self.active_ms_baseline = self.planned_ms;
    }

    pub fn record_reading(&mut self, reading: FocusReading) {
        self.focus.record(reading.score);
        self.latest_reading = Some(reading);
    }

    /// Back to NotStarted with the planned duration and nothing else.
    pub fn reset(&mut self) {
        *self = Self::new(self.planned_ms);
    }
}
