use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::{
    db::{
        helpers::{parse_datetime, to_i64, to_score, to_u32},
        Database,
    },
    models::SessionRecord,
};

const SESSION_COLUMNS: &str =
    "id, planned_duration_sec, completed_time_sec, focus_score, distraction_count, created_at";

pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn row_to_session(row: &Row) -> Result<SessionRecord> {
    let planned: i64 = row.get("planned_duration_sec")?;
    let completed: i64 = row.get("completed_time_sec")?;
    let focus_score: i64 = row.get("focus_score")?;
    let distraction_count: i64 = row.get("distraction_count")?;
    let created_at: String = row.get("created_at")?;

    Ok(SessionRecord {
        id: row.get("id")?,
        planned_duration_sec: to_u32(planned, "planned_duration_sec")?,
        completed_time_sec: to_u32(completed, "completed_time_sec")?,
        focus_score: to_score(focus_score)?,
        distraction_count: to_u32(distraction_count, "distraction_count")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    /// Insert a finished session under its own id and return that id.
    pub async fn insert_session(&self, record: &SessionRecord) -> Result<i64> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, planned_duration_sec, completed_time_sec, focus_score, distraction_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.planned_duration_sec,
                    record.completed_time_sec,
                    record.focus_score,
                    record.distraction_count,
                    format_timestamp(&record.created_at),
                ],
            )?;
            Ok(record.id)
        })
        .await
    }

    pub async fn get_session(&self, session_id: i64) -> Result<Option<SessionRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
            ))?;

            let session = stmt
                .query_row(params![session_id], |row| Ok(row_to_session(row)))
                .optional()?
                .transpose()?;
            Ok(session)
        })
        .await
    }

    /// Most recent sessions first.
    pub async fn list_recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let limit = to_i64(limit)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS}
                 FROM sessions
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1"
            ))?;

            let mut rows = stmt.query(params![limit])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }

    /// Delete sessions created before `cutoff` together with their
    /// distraction rows. Distractions older than `cutoff` that belong to no
    /// saved session (reset sessions, failed saves) go too. Returns the number
    /// of sessions removed.
    pub async fn prune_sessions_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let cutoff_ms = cutoff.timestamp_millis();
        let cutoff = format_timestamp(&cutoff);
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM distractions
                 WHERE session_id IN (SELECT id FROM sessions WHERE created_at < ?1)",
                params![cutoff],
            )?;

            tx.execute(
                "DELETE FROM distractions
                 WHERE timestamp_ms < ?1
                   AND session_id NOT IN (SELECT id FROM sessions)",
                params![cutoff_ms],
            )?;

            let removed = tx.execute(
                "DELETE FROM sessions WHERE created_at < ?1",
                params![cutoff],
            )?;

            tx.commit()?;
            Ok(removed)
        })
        .await
    }
}
