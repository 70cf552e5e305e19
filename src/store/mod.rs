//! SQLite-backed persistence.
//!
//! Free functions in [`sessions`] and [`facts`] take a `&Connection` so they can
//! be composed inside transactions; [`SqliteStore`] wraps a shared connection
//! and implements [`SessionStore`] for the interview engine.

pub mod facts;
pub mod sessions;

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use rusqlite::Connection;

use crate::fact::{ContextEvent, IdentityFact};
use crate::interview::session::SessionStore;
use crate::interview::types::{InterviewOutput, InterviewState};

#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))
    }

    pub fn identity_facts(&self) -> Result<Vec<IdentityFact>> {
        facts::list_identity_facts(&*self.lock()?)
    }

    pub fn context_events(&self, limit: usize) -> Result<Vec<ContextEvent>> {
        facts::list_context_events(&*self.lock()?, limit)
    }

    pub fn record_event(&self, event: &ContextEvent) -> Result<()> {
        facts::insert_context_event(&*self.lock()?, event)
    }

    pub fn identity_record(&self, session_id: &str) -> Result<Option<InterviewOutput>> {
        sessions::load_identity_record(&*self.lock()?, session_id)
    }
}

impl SessionStore for SqliteStore {
    fn save_state(&self, state: &InterviewState) -> Result<()> {
        sessions::save_session_state(&*self.lock()?, state)
    }

    fn load_state(&self, session_id: &str) -> Result<Option<InterviewState>> {
        sessions::load_session_state(&*self.lock()?, session_id)
    }

    fn save_identity(&self, output: &InterviewOutput, facts: &[IdentityFact]) -> Result<()> {
        sessions::save_identity_record(&mut *self.lock()?, output, facts)
    }
}
