//! Identity facts and context events.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};

use crate::fact::{ContextEvent, FactCategory, IdentityFact, Maturity};

/// Insert or update facts by id. `source_session` is kept from the first
/// write when `None` is passed on a later one.
pub fn upsert_identity_facts(
    conn: &Connection,
    facts: &[IdentityFact],
    source_session: Option<&str>,
) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO identity_facts
             (id, content, category, maturity, confidence, validation_count, last_validated, source_session)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
             content = excluded.content,
             category = excluded.category,
             maturity = excluded.maturity,
             confidence = excluded.confidence,
             validation_count = excluded.validation_count,
             last_validated = excluded.last_validated,
             source_session = COALESCE(excluded.source_session, identity_facts.source_session)",
    )?;

    for fact in facts {
        stmt.execute(params![
            fact.id,
            fact.content,
            fact.category.as_str(),
            fact.maturity.as_str(),
            fact.confidence,
            fact.validation_count,
            format_timestamp(&fact.last_validated),
            source_session,
        ])?;
    }
    Ok(())
}

pub fn list_identity_facts(conn: &Connection) -> Result<Vec<IdentityFact>> {
    let mut stmt = conn.prepare(
        "SELECT id, content, category, maturity, confidence, validation_count, last_validated
         FROM identity_facts
         ORDER BY last_validated DESC, id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, u32>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|row| -> Result<IdentityFact> {
            let (id, content, category, maturity, confidence, validation_count, validated) = row;
            let context = || format!("fact {id}");
            Ok(IdentityFact {
                category: category
                    .parse::<FactCategory>()
                    .map_err(anyhow::Error::msg)
                    .with_context(context)?,
                maturity: maturity
                    .parse::<Maturity>()
                    .map_err(anyhow::Error::msg)
                    .with_context(context)?,
                last_validated: parse_timestamp(&validated).with_context(context)?,
                id,
                content,
                confidence,
                validation_count,
            })
        })
        .collect()
}

pub fn insert_context_event(conn: &Connection, event: &ContextEvent) -> Result<()> {
    conn.execute(
        "INSERT INTO context_events (id, content, source, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            event.id,
            event.content,
            event.source,
            format_timestamp(&event.timestamp)
        ],
    )?;
    Ok(())
}

/// The most recent `limit` events, newest first.
pub fn list_context_events(conn: &Connection, limit: usize) -> Result<Vec<ContextEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, content, source, created_at FROM context_events
         ORDER BY created_at DESC, id DESC
         LIMIT ?1",
    )?;

    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(id, content, source, created)| -> Result<ContextEvent> {
            Ok(ContextEvent {
                timestamp: parse_timestamp(&created).with_context(|| format!("event {id}"))?,
                id,
                content,
                source,
            })
        })
        .collect()
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("invalid timestamp: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn upsert_replaces_by_id() {
        let conn = crate::db::open_memory_database().unwrap();
        let mut fact = IdentityFact::candidate("Prefers Rust", FactCategory::Preference, 0.8);
        upsert_identity_facts(&conn, &[fact.clone()], Some("s-1")).unwrap();

        fact.maturity = Maturity::Established;
        fact.validation_count = 2;
        upsert_identity_facts(&conn, &[fact.clone()], None).unwrap();

        let facts = list_identity_facts(&conn).unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].maturity, Maturity::Established);
        assert_eq!(facts[0].validation_count, 2);

        let session: Option<String> = conn
            .query_row("SELECT source_session FROM identity_facts", [], |r| r.get(0))
            .unwrap();
        assert_eq!(session.as_deref(), Some("s-1"));
    }

    #[test]
    fn unreadable_row_names_the_fact() {
        let conn = crate::db::open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO identity_facts
             (id, content, category, maturity, confidence, validation_count, last_validated)
             VALUES ('f-bad', 'Prefers Go', 'preference', 'candidate', 0.5, 0, 'yesterday')",
            [],
        )
        .unwrap();

        let err = list_identity_facts(&conn).unwrap_err();
        assert!(format!("{err:#}").contains("fact f-bad"));
    }

    #[test]
    fn events_come_back_newest_first() {
        let conn = crate::db::open_memory_database().unwrap();
        let mut old = ContextEvent::new("read about tokio", Some("browser".into()));
        old.timestamp = Utc::now() - Duration::days(3);
        let new = ContextEvent::new("shipped a release", None);
        insert_context_event(&conn, &old).unwrap();
        insert_context_event(&conn, &new).unwrap();

        let events = list_context_events(&conn, 10).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].content, "shipped a release");
        assert_eq!(events[1].source.as_deref(), Some("browser"));

        assert_eq!(list_context_events(&conn, 1).unwrap().len(), 1);
    }
}
