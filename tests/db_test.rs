use tempfile::TempDir;
use tessera::db;

#[test]
fn opening_a_v1_database_migrates_it() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("old.db");

    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        db::schema::init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO identity_facts (id, content, category, confidence, last_validated)
             VALUES ('f1', 'Uses Vim', 'expertise', 0.9, '2026-01-01T00:00:00.000000Z')",
            [],
        )
        .unwrap();
        assert_eq!(db::migrations::get_schema_version(&conn).unwrap(), 1);
    }

    let conn = db::open_database(&path).unwrap();
    assert_eq!(
        db::migrations::get_schema_version(&conn).unwrap(),
        db::migrations::CURRENT_SCHEMA_VERSION
    );

    // Existing rows survive and gain the new column.
    let session: Option<String> = conn
        .query_row(
            "SELECT source_session FROM identity_facts WHERE id = 'f1'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(session.is_none());

    let facts = tessera::store::facts::list_identity_facts(&conn).unwrap();
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].content, "Uses Vim");
}

#[test]
fn busy_timeout_is_set() {
    let tmp = TempDir::new().unwrap();
    let conn = db::open_database(tmp.path().join("t.db")).unwrap();
    let timeout: i64 = conn
        .pragma_query_value(None, "busy_timeout", |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);
}

#[test]
fn health_report_counts_rows() {
    let conn = db::open_memory_database().unwrap();
    tessera::store::facts::insert_context_event(
        &conn,
        &tessera::fact::ContextEvent::new("Started learning Zig", None),
    )
    .unwrap();

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.schema_version, db::migrations::CURRENT_SCHEMA_VERSION);
    assert_eq!(report.context_events, 1);
    assert_eq!(report.identity_records, 0);
}
