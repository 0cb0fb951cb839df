use anyhow::Result;
use rusqlite::params;

use crate::{
    db::{helpers::parse_kind, Database},
    models::DistractionEvent,
};

impl Database {
    pub async fn insert_distraction(&self, event: &DistractionEvent) -> Result<()> {
        let event = event.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO distractions (session_id, kind, timestamp_ms)
                 VALUES (?1, ?2, ?3)",
                params![event.session_id, event.kind.as_str(), event.timestamp_ms],
            )?;
            Ok(())
        })
        .await
    }

    /// Distractions of one session in detection order.
    pub async fn distractions_for_session(&self, session_id: i64) -> Result<Vec<DistractionEvent>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, kind, timestamp_ms
                 FROM distractions
                 WHERE session_id = ?1
                 ORDER BY timestamp_ms ASC, id ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut events = Vec::new();
            while let Some(row) = rows.next()? {
                let kind: String = row.get(1)?;
                events.push(DistractionEvent {
                    session_id: row.get(0)?,
                    kind: parse_kind(&kind)?,
                    timestamp_ms: row.get(2)?,
                });
            }

            Ok(events)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DistractionKind;

    #[tokio::test]
    async fn keeps_detection_order_per_session() {
        let db = Database::open_in_memory().unwrap();
        for (session_id, ts) in [(7, 300), (7, 100), (8, 50), (7, 100)] {
            db.insert_distraction(&DistractionEvent {
                session_id,
                kind: DistractionKind::AppSwitch,
                timestamp_ms: ts,
            })
            .await
            .unwrap();
        }

        let stamps: Vec<i64> = db
            .distractions_for_session(7)
            .await
            .unwrap()
            .iter()
            .map(|e| e.timestamp_ms)
            .collect();
        assert_eq!(stamps, vec![100, 100, 300]);
        assert!(db.distractions_for_session(9).await.unwrap().is_empty());
    }
}
