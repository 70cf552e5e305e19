use anyhow::Result;
use chrono::Utc;

use tessera::config::TesseraConfig;
use tessera::inject::effective_confidence;

/// List stored identity facts with their decayed confidence.
pub fn facts(config: &TesseraConfig, json: bool) -> Result<()> {
    let conn = tessera::db::open_database(config.resolved_db_path())?;
    let facts = tessera::store::facts::list_identity_facts(&conn)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&facts)?);
        return Ok(());
    }

    if facts.is_empty() {
        println!("No identity facts stored.");
        return Ok(());
    }

    let now = Utc::now();
    println!("{:<11} {:<11} {:>5} {:>5}  Content", "Category", "Maturity", "Conf", "Eff");
    println!("{}", "-".repeat(60));
    for fact in &facts {
        println!(
            "{:<11} {:<11} {:>5.2} {:>5.2}  {}",
            fact.category.as_str(),
            fact.maturity.as_str(),
            fact.confidence,
            effective_confidence(fact, now, config.injection.half_life_days),
            fact.content,
        );
    }
    println!();
    println!("{} fact(s)", facts.len());
    Ok(())
}
