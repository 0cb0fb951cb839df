use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistractionKind {
    AppSwitch,
}

impl DistractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistractionKind::AppSwitch => "app_switch",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "app_switch" => Some(DistractionKind::AppSwitch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DistractionEvent {
    pub session_id: i64,
    pub kind: DistractionKind,
    pub timestamp_ms: i64,
}

/// Summary of one finished study session. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: i64,
    pub planned_duration_sec: u32,
    pub completed_time_sec: u32,
    pub focus_score: u8,
    pub distraction_count: u32,
    pub created_at: DateTime<Utc>,
}
