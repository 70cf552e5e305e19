mod helpers;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use helpers::{aged_fact, test_store};
use tessera::config::{InjectionConfig, RemoteConfig};
use tessera::fact::{ContextEvent, IdentityFact, Maturity};
use tessera::inject::{
    configured_sources, merge_facts_for_injection, render_context, FactSource, LocalSource,
};
use tessera::store::facts::upsert_identity_facts;

/// Stand-in for a remote store.
struct Canned {
    facts: Vec<IdentityFact>,
    events: Vec<ContextEvent>,
}

#[async_trait]
impl FactSource for Canned {
    fn name(&self) -> &str {
        "canned"
    }

    async fn load_facts(&self) -> anyhow::Result<Vec<IdentityFact>> {
        Ok(self.facts.clone())
    }

    async fn load_events(&self) -> anyhow::Result<Vec<ContextEvent>> {
        Ok(self.events.clone())
    }
}

struct Unreachable;

#[async_trait]
impl FactSource for Unreachable {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn load_facts(&self) -> anyhow::Result<Vec<IdentityFact>> {
        anyhow::bail!("timed out")
    }

    async fn load_events(&self) -> anyhow::Result<Vec<ContextEvent>> {
        anyhow::bail!("timed out")
    }
}

fn event(content: &str, hours_ago: i64) -> ContextEvent {
    let mut e = ContextEvent::new(content, Some("browser".into()));
    e.timestamp = Utc::now() - Duration::hours(hours_ago);
    e
}

#[tokio::test]
async fn local_and_remote_merge_into_sections() {
    let store = test_store();
    {
        let conn = store.connection();
        let conn = conn.lock().unwrap();
        upsert_identity_facts(
            &conn,
            &[
                aged_fact("Prefers TypeScript for frontend work", 0.8, 0, Maturity::Candidate),
                aged_fact("Maintains an open source CLI", 0.8, 120, Maturity::Proven),
            ],
            None,
        )
        .unwrap();
    }
    store
        .record_event(&event("User really prefers TypeScript", 30))
        .unwrap();

    let remote = Canned {
        facts: vec![aged_fact("Leads the payments team", 0.9, 5, Maturity::Proven)],
        events: vec![
            event("User prefers TypeScript", 2),
            event("Read a post about WebAssembly", 1),
        ],
    };

    let sources: Vec<Arc<dyn FactSource>> =
        vec![Arc::new(LocalSource::new(store.clone())), Arc::new(remote)];
    let merged = merge_facts_for_injection(&sources, &InjectionConfig::default()).await;

    // The 120-day-old fact decayed to 0.2 and is gone; proven ranks first.
    let facts: Vec<&str> = merged.facts.iter().map(|f| f.fact.content.as_str()).collect();
    assert_eq!(facts, ["Leads the payments team", "Prefers TypeScript for frontend work"]);

    // Of the two near-identical events, only the newer survives.
    let events: Vec<&str> = merged.events.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(events, ["Read a post about WebAssembly", "User prefers TypeScript"]);

    let text = render_context(&merged);
    assert!(text.starts_with("## About this user\n- Leads the payments team (proven)"));
    assert!(text.contains("\n\n## Recent learnings\n"));
}

#[tokio::test]
async fn failed_source_does_not_block_the_others() {
    let store = test_store();
    store.record_event(&event("Switched to a standing desk", 3)).unwrap();

    let sources: Vec<Arc<dyn FactSource>> =
        vec![Arc::new(Unreachable), Arc::new(LocalSource::new(store))];
    let merged = merge_facts_for_injection(&sources, &InjectionConfig::default()).await;

    assert!(merged.facts.is_empty());
    assert_eq!(merged.events.len(), 1);
    let text = render_context(&merged);
    assert!(!text.contains("About this user"));
    assert!(text.starts_with("## Recent learnings"));
}

#[tokio::test]
async fn budgets_cap_whole_items() {
    let config = InjectionConfig {
        fact_budget_chars: 250,
        ..InjectionConfig::default()
    };
    let facts = (0..3)
        .map(|i| {
            // Distinct 100-character facts.
            let content = format!("{i}{}", "y".repeat(99));
            aged_fact(&content, 0.9, 0, Maturity::Established)
        })
        .collect();
    let sources: Vec<Arc<dyn FactSource>> = vec![Arc::new(Canned {
        facts,
        events: Vec::new(),
    })];

    let merged = merge_facts_for_injection(&sources, &config).await;
    assert_eq!(merged.facts.len(), 2);
    assert!(merged.facts.iter().all(|f| f.fact.content.len() == 100));
}

#[tokio::test]
async fn nothing_stored_renders_nothing() {
    let store = test_store();
    let sources = configured_sources(&store, &RemoteConfig::default()).unwrap();
    let merged = merge_facts_for_injection(&sources, &InjectionConfig::default()).await;
    assert!(merged.is_empty());
    assert_eq!(render_context(&merged), "");
}
