//! Read-time merge of facts and events from every configured source into a
//! bounded, ranked block for prompt injection.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;

use super::decay::{decay_and_rank, ScoredFact};
use super::sources::FactSource;
use crate::config::InjectionConfig;
use crate::fact::{jaccard, ContextEvent, IdentityFact};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InjectionContext {
    pub facts: Vec<ScoredFact>,
    pub events: Vec<ContextEvent>,
}

impl InjectionContext {
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.events.is_empty()
    }
}

/// Read all sources concurrently and merge what they return. A source that
/// fails (for either facts or events) contributes nothing for that half.
pub async fn merge_facts_for_injection(
    sources: &[Arc<dyn FactSource>],
    config: &InjectionConfig,
) -> InjectionContext {
    let loads = sources.iter().map(|source| async move {
        let (facts, events) = tokio::join!(source.load_facts(), source.load_events());
        let facts = facts.unwrap_or_else(|e| {
            tracing::warn!(source = source.name(), error = %e, "fact source failed");
            Vec::new()
        });
        let events = events.unwrap_or_else(|e| {
            tracing::warn!(source = source.name(), error = %e, "event source failed");
            Vec::new()
        });
        (facts, events)
    });

    let mut all_facts = Vec::new();
    let mut all_events = Vec::new();
    for (facts, events) in join_all(loads).await {
        all_facts.extend(facts);
        all_events.extend(events);
    }

    let merged = merge_loaded(all_facts, all_events, config, Utc::now());
    tracing::info!(
        sources = sources.len(),
        facts = merged.facts.len(),
        events = merged.events.len(),
        "injection context merged"
    );
    merged
}

/// The pure part of the merge, over already-loaded data.
pub fn merge_loaded(
    facts: Vec<IdentityFact>,
    events: Vec<ContextEvent>,
    config: &InjectionConfig,
    now: DateTime<Utc>,
) -> InjectionContext {
    let facts = decay_and_rank(
        collapse_by_id(facts),
        now,
        config.half_life_days,
        config.min_effective_confidence,
    );

    let events: Vec<ContextEvent> = dedup_events(events, config.event_similarity_threshold)
        .into_iter()
        .filter(|event| {
            !facts
                .iter()
                .any(|f| jaccard(&event.content, &f.fact.content) > config.fact_overlap_threshold)
        })
        .collect();

    InjectionContext {
        facts: within_budget(facts, config.fact_budget_chars, |f| f.fact.content.as_str()),
        events: within_budget(events, config.event_budget_chars, |e| e.content.as_str()),
    }
}

/// One copy per id, the most recently validated one, in first-seen order.
fn collapse_by_id(facts: Vec<IdentityFact>) -> Vec<IdentityFact> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<IdentityFact> = Vec::with_capacity(facts.len());

    for fact in facts {
        match index.get(&fact.id) {
            Some(&i) => {
                if fact.last_validated > out[i].last_validated {
                    out[i] = fact;
                }
            }
            None => {
                index.insert(fact.id.clone(), out.len());
                out.push(fact);
            }
        }
    }
    out
}

/// Newest first; an event is dropped when it is at least `threshold`
/// similar to a newer one that was kept.
pub fn dedup_events(mut events: Vec<ContextEvent>, threshold: f64) -> Vec<ContextEvent> {
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut kept: Vec<ContextEvent> = Vec::with_capacity(events.len());
    for event in events {
        if kept
            .iter()
            .any(|k| jaccard(&k.content, &event.content) >= threshold)
        {
            continue;
        }
        kept.push(event);
    }
    kept
}

/// Take items in order while the running character count stays within
/// `budget`. Items are never cut; the walk stops at the first that does not fit.
pub fn within_budget<T>(items: Vec<T>, budget: usize, text: impl Fn(&T) -> &str) -> Vec<T> {
    let mut used = 0;
    let mut out = Vec::new();
    for item in items {
        let len = text(&item).chars().count();
        if used + len > budget {
            break;
        }
        used += len;
        out.push(item);
    }
    out
}
