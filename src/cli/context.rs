//! CLI `context` command: print the block `get_user_context` would return.

use std::sync::{Arc, Mutex};

use anyhow::Result;

use tessera::config::TesseraConfig;
use tessera::inject::{configured_sources, merge_facts_for_injection, render_context};
use tessera::store::SqliteStore;

pub async fn context(config: &TesseraConfig, json: bool) -> Result<()> {
    let conn = tessera::db::open_database(config.resolved_db_path())?;
    let store = SqliteStore::new(Arc::new(Mutex::new(conn)));
    let sources = configured_sources(&store, &config.remote)?;

    let merged = merge_facts_for_injection(&sources, &config.injection).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&merged)?);
    } else if merged.is_empty() {
        println!("Nothing known yet. Run `tessera interview` to get started.");
    } else {
        println!("{}", render_context(&merged));
    }
    Ok(())
}
