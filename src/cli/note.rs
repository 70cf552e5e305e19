use anyhow::{ensure, Result};

use tessera::config::TesseraConfig;
use tessera::fact::ContextEvent;

/// Record a context event from the terminal.
pub fn note(config: &TesseraConfig, text: &str, source: Option<String>) -> Result<()> {
    let text = text.trim();
    ensure!(!text.is_empty(), "note text must not be empty");

    let conn = tessera::db::open_database(config.resolved_db_path())?;
    let event = ContextEvent::new(text, source.or_else(|| Some("cli".into())));
    tessera::store::facts::insert_context_event(&conn, &event)?;

    println!("Recorded {}", event.id);
    Ok(())
}
