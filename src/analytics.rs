//! Aggregate statistics over saved sessions.

use serde::Serialize;

use crate::{db::SessionStore, error::StorageError, models::SessionRecord, settings::Settings};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_sessions: u32,
    /// Sum of completed time, in whole minutes.
    pub total_focus_minutes: u32,
    pub average_focus_score: u8,
    pub total_distractions: u32,
}

impl SessionStats {
    pub fn from_records(records: &[SessionRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let total_seconds: u64 = records
            .iter()
            .map(|record| u64::from(record.completed_time_sec))
            .sum();
        let score_sum: u64 = records
            .iter()
            .map(|record| u64::from(record.focus_score))
            .sum();
        let total_distractions = records
            .iter()
            .fold(0u32, |acc, record| acc.saturating_add(record.distraction_count));

        let count = records.len() as f64;
        Self {
            total_sessions: u32::try_from(records.len()).unwrap_or(u32::MAX),
            total_focus_minutes: (total_seconds as f64 / 60.0).round() as u32,
            average_focus_score: (score_sum as f64 / count).round().clamp(0.0, 100.0) as u8,
            total_distractions,
        }
    }
}

/// Stats over the `limit` most recent sessions.
pub async fn load_stats<S: SessionStore>(store: &S, limit: usize) -> Result<SessionStats, StorageError> {
    let records = store.list_sessions(limit).await?;
    Ok(SessionStats::from_records(&records))
}

/// Sessions shown in history, capped by `Settings::history_limit`.
pub async fn recent_history<S: SessionStore>(
    store: &S,
    settings: &Settings,
) -> Result<Vec<SessionRecord>, StorageError> {
    store.list_sessions(settings.history_limit).await
}

/// Stats over the history window configured in settings.
pub async fn history_stats<S: SessionStore>(store: &S, settings: &Settings) -> Result<SessionStats, StorageError> {
    load_stats(store, settings.history_limit).await
}
