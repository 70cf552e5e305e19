//! Interview state and identity record persistence.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::fact::IdentityFact;
use crate::interview::types::{InterviewOutput, InterviewState};

use super::facts::{format_timestamp, upsert_identity_facts};

/// Insert or replace the serialized state of one session.
pub fn save_session_state(conn: &Connection, state: &InterviewState) -> Result<()> {
    let json = serde_json::to_string(state).context("failed to serialize interview state")?;
    conn.execute(
        "INSERT INTO interview_sessions (id, status, state, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
             status = excluded.status,
             state = excluded.state,
             updated_at = excluded.updated_at",
        params![state.id, state.status.as_str(), json, format_timestamp(&Utc::now())],
    )?;
    Ok(())
}

pub fn load_session_state(conn: &Connection, session_id: &str) -> Result<Option<InterviewState>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT state FROM interview_sessions WHERE id = ?1",
            [session_id],
            |row| row.get(0),
        )
        .optional()?;

    json.map(|json| {
        serde_json::from_str(&json)
            .with_context(|| format!("corrupt state for session {session_id}"))
    })
    .transpose()
}

/// Save a completed interview's record and its derived facts in one transaction.
pub fn save_identity_record(
    conn: &mut Connection,
    output: &InterviewOutput,
    facts: &[IdentityFact],
) -> Result<()> {
    let identity = serde_json::to_string(&output.identity)?;
    let full = serde_json::to_string(output)?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT OR REPLACE INTO identity_records (session_id, identity, output, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![output.session_id, identity, full, format_timestamp(&Utc::now())],
    )?;
    upsert_identity_facts(&tx, facts, Some(&output.session_id))?;
    tx.commit()?;
    Ok(())
}

pub fn load_identity_record(conn: &Connection, session_id: &str) -> Result<Option<InterviewOutput>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT output FROM identity_records WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )
        .optional()?;

    json.map(|json| serde_json::from_str(&json).context("corrupt identity record"))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::types::InterviewStatus;

    #[test]
    fn state_round_trips_and_overwrites() {
        let conn = crate::db::open_memory_database().unwrap();
        let mut state = InterviewState::new("s-1");
        save_session_state(&conn, &state).unwrap();

        state.status = InterviewStatus::InProgress;
        save_session_state(&conn, &state).unwrap();

        let loaded = load_session_state(&conn, "s-1").unwrap().unwrap();
        assert_eq!(loaded, state);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM interview_sessions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn missing_session_is_none() {
        let conn = crate::db::open_memory_database().unwrap();
        assert!(load_session_state(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn corrupt_state_is_an_error() {
        let conn = crate::db::open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO interview_sessions (id, status, state, updated_at)
             VALUES ('bad', 'in_progress', '{not json', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        assert!(load_session_state(&conn, "bad").is_err());
    }
}
