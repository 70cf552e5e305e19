//! Session management: at most one in-memory conductor per session id,
//! reconstructed from the [`SessionStore`] when absent.
//!
//! State is saved after every transition. A failed state save is logged and
//! tolerated (the worst case is a session that cannot be resumed). A failed
//! identity save on completion is reported back as a warning on the turn.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::conductor::{InterviewConductor, NextStep};
use super::extractor::SuppliedFact;
use super::output::to_identity_facts;
use super::types::{
    BranchDecision, InterviewOutput, InterviewQuestion, InterviewState, InterviewStatus,
};
use super::InterviewError;
use crate::completion::CompletionProvider;
use crate::config::InterviewConfig;
use crate::fact::{ExtractedFact, IdentityFact};

/// Durable key-value persistence for interview sessions and their results.
pub trait SessionStore: Send + Sync {
    fn save_state(&self, state: &InterviewState) -> anyhow::Result<()>;

    fn load_state(&self, session_id: &str) -> anyhow::Result<Option<InterviewState>>;

    fn save_identity(&self, output: &InterviewOutput, facts: &[IdentityFact])
        -> anyhow::Result<()>;
}

/// One turn of a session as seen by the outer surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct SessionTurn {
    pub session_id: String,
    pub status: InterviewStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facts: Vec<ExtractedFact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<String>,
    pub next: NextStep,
    /// Set when the interview completed but its result could not be saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub struct SessionManager {
    sessions: HashMap<String, InterviewConductor>,
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn CompletionProvider>,
    config: InterviewConfig,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn CompletionProvider>,
        config: InterviewConfig,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            store,
            provider,
            config,
        }
    }

    /// Number of sessions currently held in memory.
    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Start a new session and return its first question.
    pub fn start(&mut self) -> Result<SessionTurn, InterviewError> {
        let id = uuid::Uuid::now_v7().to_string();
        let mut conductor =
            InterviewConductor::new(id.clone(), Arc::clone(&self.provider), &self.config);
        let first = conductor.start()?;

        self.save_state(conductor.state());
        self.sessions.insert(id.clone(), conductor);

        Ok(SessionTurn {
            session_id: id,
            status: InterviewStatus::InProgress,
            facts: Vec::new(),
            extraction_error: None,
            next: NextStep::Question(first),
            warning: None,
        })
    }

    /// Answer the pending question of `session_id`. `facts` selects the
    /// caller-supplied extraction path.
    pub async fn answer(
        &mut self,
        session_id: &str,
        text: &str,
        facts: Option<Vec<SuppliedFact>>,
    ) -> Result<SessionTurn, InterviewError> {
        let conductor = self.conductor(session_id)?;
        let outcome = match facts {
            Some(facts) => conductor.answer_with_facts(text, facts).await?,
            None => conductor.answer(text).await?,
        };

        // Zero suggestions is the same as the user declining to continue.
        let next = match outcome.next {
            NextStep::BranchDecision { ref suggested, .. } if suggested.is_empty() => {
                tracing::info!(session = %session_id, "no branch questions, completing");
                conductor.decide_branching(BranchDecision::Done)?
            }
            next => next,
        };
        let state = conductor.state().clone();

        let mut turn = self.settle(state, next);
        turn.facts = outcome.facts;
        turn.extraction_error = outcome.extraction_error;
        Ok(turn)
    }

    /// Resolve the branch decision point of `session_id`.
    pub fn decide_branching(
        &mut self,
        session_id: &str,
        decision: BranchDecision,
    ) -> Result<SessionTurn, InterviewError> {
        let conductor = self.conductor(session_id)?;
        let next = conductor.decide_branching(decision)?;
        let state = conductor.state().clone();
        Ok(self.settle(state, next))
    }

    /// Abandon a non-terminal session.
    pub fn abandon(&mut self, session_id: &str) -> Result<(), InterviewError> {
        let conductor = self.conductor(session_id)?;
        conductor.abandon()?;
        let state = conductor.state().clone();
        self.save_state(&state);
        self.sessions.remove(session_id);
        Ok(())
    }

    /// The question currently awaiting an answer, if any.
    pub fn pending_question(
        &mut self,
        session_id: &str,
    ) -> Result<Option<InterviewQuestion>, InterviewError> {
        Ok(self.conductor(session_id)?.pending_question())
    }

    /// The step to present when picking a session back up.
    pub fn current_step(&mut self, session_id: &str) -> Result<NextStep, InterviewError> {
        self.conductor(session_id)?.current_step()
    }

    /// A copy of the session's current state.
    pub fn state(&mut self, session_id: &str) -> Result<InterviewState, InterviewError> {
        Ok(self.conductor(session_id)?.state().clone())
    }

    /// The in-memory conductor for `session_id`, restoring it from storage
    /// if this process has not seen it yet.
    fn conductor(&mut self, session_id: &str) -> Result<&mut InterviewConductor, InterviewError> {
        if !self.sessions.contains_key(session_id) {
            let state = match self.store.load_state(session_id) {
                Ok(Some(state)) => state,
                Ok(None) => return Err(InterviewError::UnknownSession(session_id.to_string())),
                Err(e) => {
                    tracing::warn!(session = %session_id, error = %e, "failed to load session state");
                    return Err(InterviewError::Persistence(format!("{e:#}")));
                }
            };
            tracing::info!(session = %session_id, status = %state.status, "session restored");
            let conductor =
                InterviewConductor::from_state(state, Arc::clone(&self.provider), &self.config);
            self.sessions.insert(session_id.to_string(), conductor);
        }

        self.sessions
            .get_mut(session_id)
            .ok_or_else(|| InterviewError::UnknownSession(session_id.to_string()))
    }

    /// Persist after a transition and build the turn. Completed sessions
    /// are dropped from memory once their identity has been handed to the store.
    fn settle(&mut self, state: InterviewState, next: NextStep) -> SessionTurn {
        self.save_state(&state);
        let session_id = state.id.as_str();

        let mut warning = None;
        if let NextStep::Completed(output) = &next {
            let facts = to_identity_facts(output);
            match self.store.save_identity(output, &facts) {
                Ok(()) => {
                    tracing::info!(session = %session_id, facts = facts.len(), "identity saved");
                }
                Err(e) => {
                    tracing::error!(session = %session_id, error = %e, "failed to save identity");
                    warning = Some(format!(
                        "interview completed but the identity record could not be saved: {e}"
                    ));
                }
            }
            self.sessions.remove(session_id);
        }

        SessionTurn {
            session_id: state.id,
            status: state.status,
            facts: Vec::new(),
            extraction_error: None,
            next,
            warning,
        }
    }

    fn save_state(&self, state: &InterviewState) {
        if let Err(e) = self.store.save_state(state) {
            tracing::warn!(session = %state.id, error = %e, "failed to save session state");
        }
    }
}
