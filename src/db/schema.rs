//! SQL DDL for the base (v1) schema.
//!
//! Defines `interview_sessions`, `identity_records`, `identity_facts`,
//! `context_events`, and `schema_meta`. Everything uses `IF NOT EXISTS` so
//! initialization can run on every open. Later changes live in
//! [`super::migrations`].

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Serialized interview state, one row per session
CREATE TABLE IF NOT EXISTS interview_sessions (
    id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    state TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_status ON interview_sessions(status);

-- Final output of completed interviews
CREATE TABLE IF NOT EXISTS identity_records (
    session_id TEXT PRIMARY KEY,
    identity TEXT NOT NULL,
    output TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Consumption-side identity facts
CREATE TABLE IF NOT EXISTS identity_facts (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    category TEXT NOT NULL CHECK(category IN ('core','expertise','preference','context','focus')),
    maturity TEXT NOT NULL DEFAULT 'candidate' CHECK(maturity IN ('candidate','established','proven')),
    confidence REAL NOT NULL CHECK(confidence >= 0.0 AND confidence <= 1.0),
    validation_count INTEGER NOT NULL DEFAULT 0,
    last_validated TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_facts_category ON identity_facts(category);

-- Time-stamped observations about the user
CREATE TABLE IF NOT EXISTS context_events (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    source TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_created ON context_events(created_at);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Create the base tables and record schema version 1 on a fresh database.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;
    Ok(())
}
