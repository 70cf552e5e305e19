//! CLI `doctor` command: database and configuration diagnostics.

use anyhow::{Context, Result};

use tessera::config::TesseraConfig;
use tessera::db;

pub fn doctor(config: &TesseraConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    println!("Tessera Health Report");
    println!("=====================");
    println!();

    if !db_path.exists() {
        println!("Database:          not found at {}", db_path.display());
        println!("Run `tessera interview` or `tessera serve` to create it.");
    } else {
        let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
        let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
        let report = db::check_database_health(&conn).context("failed to run health check")?;

        println!("Database:          {}", db_path.display());
        println!("File size:         {}", format_bytes(file_size));
        println!("Schema version:    {}", report.schema_version);
        println!();
        println!("Interviews:");
        println!("  In progress:     {}", report.sessions_in_progress);
        println!("  Completed:       {}", report.sessions_completed);
        println!("  Abandoned:       {}", report.sessions_abandoned);
        println!("  Records saved:   {}", report.identity_records);
        println!();
        println!("Identity facts:    {}", report.identity_facts);
        println!("Context events:    {}", report.context_events);
        println!();
        if report.integrity_ok {
            println!("Integrity check:   PASSED");
        } else {
            println!("Integrity check:   FAILED ({})", report.integrity_details);
            println!("Restore ~/.tessera/tessera.db from a backup, or move it aside to start fresh.");
        }
    }

    println!();
    println!("Completion:");
    println!("  Provider:        {}", config.completion.provider);
    println!("  Model:           {}", config.completion.model);
    let key_set = std::env::var(&config.completion.api_key_env).is_ok_and(|k| !k.is_empty());
    println!(
        "  API key:         ${} {}",
        config.completion.api_key_env,
        if key_set { "(set)" } else { "(missing: answers are only stored, not analyzed)" }
    );
    println!();
    println!(
        "Remote source:     {}",
        if config.remote.enabled { config.remote.url.as_str() } else { "disabled" }
    );

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    match bytes {
        b if b < 1024 => format!("{b} B"),
        b if b < 1024 * 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        b => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
    }
}
