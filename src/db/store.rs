//! Persistence collaborator seen by the tracker and the session accountant.

use std::future::Future;

use chrono::{TimeDelta, Utc};

use crate::{
    error::StorageError,
    models::{DistractionEvent, SessionRecord},
};

use super::Database;

pub const DEFAULT_RETENTION_DAYS: i64 = 30;

pub trait SessionStore: Clone + Send + Sync + 'static {
    /// Persist a finished session and return its id.
    fn save_session(
        &self,
        record: &SessionRecord,
    ) -> impl Future<Output = Result<i64, StorageError>> + Send;

    fn save_distraction(
        &self,
        event: &DistractionEvent,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Most recent first.
    fn list_sessions(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SessionRecord>, StorageError>> + Send;
}

impl SessionStore for Database {
    async fn save_session(&self, record: &SessionRecord) -> Result<i64, StorageError> {
        Ok(self.insert_session(record).await?)
    }

    async fn save_distraction(&self, event: &DistractionEvent) -> Result<(), StorageError> {
        Ok(self.insert_distraction(event).await?)
    }

    async fn list_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, StorageError> {
        Ok(self.list_recent_sessions(limit).await?)
    }
}

impl Database {
    /// Drop sessions older than `days` days.
    pub async fn prune_sessions_older_than(&self, days: i64) -> Result<usize, StorageError> {
        let cutoff = TimeDelta::try_days(days)
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .ok_or_else(|| StorageError::Unavailable(format!("retention of {days} days is out of range")))?;
        Ok(self.prune_sessions_before(cutoff).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DistractionKind;

    #[tokio::test]
    async fn database_serves_as_session_store() {
        async fn roundtrip<S: SessionStore>(store: &S) -> Vec<SessionRecord> {
            store
                .save_distraction(&DistractionEvent {
                    session_id: 5,
                    kind: DistractionKind::AppSwitch,
                    timestamp_ms: 10,
                })
                .await
                .unwrap();
            let id = store
                .save_session(&SessionRecord {
                    id: 5,
                    planned_duration_sec: 60,
                    completed_time_sec: 60,
                    focus_score: 90,
                    distraction_count: 1,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
            assert_eq!(id, 5);
            store.list_sessions(30).await.unwrap()
        }

        let db = Database::open_in_memory().unwrap();
        let sessions = roundtrip(&db).await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(db.distractions_for_session(5).await.unwrap().len(), 1);
        assert_eq!(db.prune_sessions_older_than(DEFAULT_RETENTION_DAYS).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn out_of_range_retention_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        for days in [i64::MAX, i64::MIN] {
            assert!(matches!(
                db.prune_sessions_older_than(days).await,
                Err(StorageError::Unavailable(_))
            ));
        }
    }
}
