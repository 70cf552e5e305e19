pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// Open (or create) the database at `path` with schema and migrations applied.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    prepare(&mut conn)?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open a throwaway in-memory database with the full schema.
pub fn open_memory_database() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    prepare(&mut conn)?;
    Ok(conn)
}

fn prepare(conn: &mut Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(conn).context("failed to initialize schema")?;
    migrations::run_migrations(conn).context("failed to run migrations")?;
    Ok(())
}

/// Snapshot of database state for `tessera doctor`.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub schema_version: u32,
    pub sessions_in_progress: u64,
    pub sessions_completed: u64,
    pub sessions_abandoned: u64,
    pub identity_records: u64,
    pub identity_facts: u64,
    pub context_events: u64,
    pub integrity_ok: bool,
    pub integrity_details: String,
}

pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;

    let count = |sql: &str| -> Result<u64> {
        let n: i64 = conn
            .query_row(sql, [], |row| row.get(0))
            .with_context(|| format!("count query failed: {sql}"))?;
        Ok(n.max(0) as u64)
    };
    let sessions_with = |status: &str| -> Result<u64> {
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM interview_sessions WHERE status = ?1",
            [status],
            |row| row.get(0),
        )?;
        Ok(n.max(0) as u64)
    };

    // Everything that is neither finished nor given up on.
    let sessions_in_progress = count(
        "SELECT COUNT(*) FROM interview_sessions WHERE status NOT IN ('completed', 'abandoned')",
    )?;

    let integrity_details: String =
        conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;

    Ok(HealthReport {
        schema_version,
        sessions_in_progress,
        sessions_completed: sessions_with("completed")?,
        sessions_abandoned: sessions_with("abandoned")?,
        identity_records: count("SELECT COUNT(*) FROM identity_records")?,
        identity_facts: count("SELECT COUNT(*) FROM identity_facts")?,
        context_events: count("SELECT COUNT(*) FROM context_events")?,
        integrity_ok: integrity_details == "ok",
        integrity_details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_database_is_created_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tessera.db");
        let conn = open_database(&path).unwrap();
        assert!(path.exists());
        assert_eq!(
            migrations::get_schema_version(&conn).unwrap(),
            migrations::CURRENT_SCHEMA_VERSION
        );
    }

    #[test]
    fn health_of_empty_database() {
        let conn = open_memory_database().unwrap();
        let report = check_database_health(&conn).unwrap();
        assert!(report.integrity_ok);
        assert_eq!(report.identity_facts, 0);
        assert_eq!(report.sessions_in_progress, 0);
    }
}
