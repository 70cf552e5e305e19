#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use tessera::completion::{CompletionError, CompletionProvider};
use tessera::config::InterviewConfig;
use tessera::fact::{FactCategory, IdentityFact, Maturity};
use tessera::interview::extractor::SuppliedFact;
use tessera::interview::session::SessionManager;
use tessera::store::SqliteStore;

/// A store over a fresh in-memory database with the full schema.
pub fn test_store() -> SqliteStore {
    let conn = tessera::db::open_memory_database().unwrap();
    SqliteStore::new(Arc::new(Mutex::new(conn)))
}

/// Completion provider that replays canned replies in order and fails once
/// they run out. Every prompt it receives is recorded.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a failing call (e.g. a 500 from the service).
    pub fn then_fail(self, reason: &str) -> Self {
        self.replies.lock().unwrap().push_back(Err(reason.to_string()));
        self
    }

    pub fn with_reply(self, reply: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(reason)) => Err(CompletionError::Status {
                status: 500,
                body: reason,
            }),
            None => Err(CompletionError::Disabled),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn manager(store: &SqliteStore, provider: Arc<dyn CompletionProvider>) -> SessionManager {
    SessionManager::new(Arc::new(store.clone()), provider, InterviewConfig::default())
}

pub fn supplied(category: &str, content: &str) -> SuppliedFact {
    SuppliedFact {
        category: category.into(),
        content: content.into(),
        confidence: Some(1.0),
        visibility: None,
        evidence: None,
    }
}

/// An identity fact last validated `age_days` ago.
pub fn aged_fact(content: &str, confidence: f64, age_days: i64, maturity: Maturity) -> IdentityFact {
    let mut fact = IdentityFact::candidate(content, FactCategory::Context, confidence);
    fact.last_validated = Utc::now() - Duration::days(age_days);
    fact.maturity = maturity;
    fact
}
