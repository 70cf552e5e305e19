//! Interview state machine.
//!
//! The conductor owns one [`InterviewState`] and is the only thing that
//! mutates it. The pending question is derived from exchange counts on every
//! call, never stored, so a restored state always resumes at the right place.
//! External calls (extraction, branch generation) are awaited in full before
//! any field of the state changes.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::branching::BranchQuestionGenerator;
use super::extractor::{FactExtractor, SuppliedFact};
use super::output::build_output;
use super::questions::core_question;
use super::types::{
    BranchDecision, BranchQuestion, InterviewExchange, InterviewOutput, InterviewQuestion,
    InterviewState, InterviewStatus,
};
use super::InterviewError;
use crate::completion::CompletionProvider;
use crate::config::InterviewConfig;
use crate::fact::ExtractedFact;

/// What the caller should present next.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NextStep {
    Question(InterviewQuestion),
    BranchDecision {
        summary: String,
        suggested: Vec<BranchQuestion>,
    },
    Completed(Box<InterviewOutput>),
}

/// Result of answering one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerOutcome {
    pub facts: Vec<ExtractedFact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<String>,
    pub next: NextStep,
}

pub struct InterviewConductor {
    state: InterviewState,
    extractor: FactExtractor,
    branches: BranchQuestionGenerator,
    max_branch_questions: usize,
}

impl InterviewConductor {
    pub fn new(
        id: impl Into<String>,
        provider: Arc<dyn CompletionProvider>,
        config: &InterviewConfig,
    ) -> Self {
        Self {
            state: InterviewState::new(id),
            extractor: FactExtractor::new(Arc::clone(&provider), config.min_answer_chars),
            branches: BranchQuestionGenerator::new(provider),
            max_branch_questions: config.max_branch_questions,
        }
    }

    /// Rebuild a conductor around previously serialized state.
    pub fn from_state(
        state: InterviewState,
        provider: Arc<dyn CompletionProvider>,
        config: &InterviewConfig,
    ) -> Self {
        let mut conductor = Self::new(state.id.clone(), provider, config);
        conductor.restore_state(state);
        conductor
    }

    pub fn state(&self) -> &InterviewState {
        &self.state
    }

    pub fn id(&self) -> &str {
        &self.state.id
    }

    pub fn status(&self) -> InterviewStatus {
        self.state.status
    }

    /// Replace the working state wholesale.
    pub fn restore_state(&mut self, state: InterviewState) {
        self.state = state;
    }

    /// The question awaiting an answer, derived from exchange counts.
    pub fn pending_question(&self) -> Option<InterviewQuestion> {
        match self.state.status {
            InterviewStatus::InProgress => core_question(self.state.core_exchanges.len()),
            InterviewStatus::Branching => self
                .state
                .suggested_branches
                .as_ref()
                .and_then(|b| b.get(self.state.branch_exchanges.len()))
                .map(BranchQuestion::to_question),
            _ => None,
        }
    }

    /// What a caller picking this session back up should present.
    pub fn current_step(&self) -> Result<NextStep, InterviewError> {
        match self.state.status {
            InterviewStatus::AwaitingBranchDecision => Ok(NextStep::BranchDecision {
                summary: self.state.summary.clone().unwrap_or_default(),
                suggested: self.state.suggested_branches.clone().unwrap_or_default(),
            }),
            _ => self
                .pending_question()
                .map(NextStep::Question)
                .ok_or_else(|| self.illegal("resume")),
        }
    }

    /// `not_started → in_progress`. Returns the first core question.
    pub fn start(&mut self) -> Result<InterviewQuestion, InterviewError> {
        if self.state.status != InterviewStatus::NotStarted {
            return Err(self.illegal("start"));
        }
        let first = core_question(0).ok_or(InterviewError::NoPendingQuestion {
            status: self.state.status,
        })?;

        self.state.status = InterviewStatus::InProgress;
        self.state.started_at = Utc::now();
        tracing::info!(session = %self.state.id, "interview started");
        Ok(first)
    }

    /// Answer the pending question, extracting facts via the completion provider.
    pub async fn answer(&mut self, text: &str) -> Result<AnswerOutcome, InterviewError> {
        self.answer_inner(text, None).await
    }

    /// Answer the pending question with facts the caller already extracted.
    pub async fn answer_with_facts(
        &mut self,
        text: &str,
        facts: Vec<SuppliedFact>,
    ) -> Result<AnswerOutcome, InterviewError> {
        self.answer_inner(text, Some(facts)).await
    }

    async fn answer_inner(
        &mut self,
        text: &str,
        supplied: Option<Vec<SuppliedFact>>,
    ) -> Result<AnswerOutcome, InterviewError> {
        let status = self.state.status;
        if !matches!(status, InterviewStatus::InProgress | InterviewStatus::Branching) {
            return Err(self.illegal("answer"));
        }
        let question = self
            .pending_question()
            .ok_or(InterviewError::NoPendingQuestion { status })?;

        let extraction = self
            .extractor
            .extract(&question, text, &self.state.all_facts, supplied)
            .await;

        let now = Utc::now();
        let anchor = self
            .state
            .exchanges()
            .map(|e| e.timestamp)
            .max()
            .unwrap_or(self.state.started_at);
        let exchange = InterviewExchange {
            question,
            answer: text.to_string(),
            facts: extraction.facts.clone(),
            timestamp: now,
            duration_ms: (now - anchor).num_milliseconds().max(0) as u64,
        };

        tracing::info!(
            session = %self.state.id,
            question = %exchange.question.id,
            facts = exchange.facts.len(),
            "answer recorded"
        );

        let next = match status {
            InterviewStatus::InProgress => self.after_core_answer(exchange).await,
            _ => self.after_branch_answer(exchange),
        };

        Ok(AnswerOutcome {
            facts: extraction.facts,
            extraction_error: extraction.error,
            next,
        })
    }

    async fn after_core_answer(&mut self, exchange: InterviewExchange) -> NextStep {
        if let Some(next) = core_question(self.state.core_exchanges.len() + 1) {
            self.push_core(exchange);
            return NextStep::Question(next);
        }

        // Last core answer: generate branches against the prospective
        // transcript, then commit everything at once.
        let mut transcript = self.state.core_exchanges.clone();
        transcript.push(exchange.clone());
        let mut facts = self.state.all_facts.clone();
        facts.extend(exchange.facts.iter().cloned());
        let suggestions = self.branches.generate(&transcript, &facts).await;

        self.push_core(exchange);
        self.state.status = InterviewStatus::AwaitingBranchDecision;
        self.state.suggested_branches = Some(suggestions.questions.clone());
        self.state.summary = Some(suggestions.summary.clone()).filter(|s| !s.is_empty());

        tracing::info!(
            session = %self.state.id,
            suggested = suggestions.questions.len(),
            "core questions complete, awaiting branch decision"
        );

        NextStep::BranchDecision {
            summary: suggestions.summary,
            suggested: suggestions.questions,
        }
    }

    fn after_branch_answer(&mut self, exchange: InterviewExchange) -> NextStep {
        self.state.all_facts.extend(exchange.facts.iter().cloned());
        self.state.branch_exchanges.push(exchange);

        match self.pending_question() {
            Some(next) => NextStep::Question(next),
            None => self.complete(),
        }
    }

    fn push_core(&mut self, exchange: InterviewExchange) {
        self.state.all_facts.extend(exchange.facts.iter().cloned());
        self.state.core_exchanges.push(exchange);
    }

    /// Resolve the branch decision point.
    pub fn decide_branching(
        &mut self,
        decision: BranchDecision,
    ) -> Result<NextStep, InterviewError> {
        if self.state.status != InterviewStatus::AwaitingBranchDecision {
            return Err(self.illegal("decide branching"));
        }

        let selected = match decision {
            BranchDecision::Done => return Ok(self.complete()),
            BranchDecision::Continue { selected_questions } => selected_questions,
        };

        let suggested = self.state.suggested_branches.take().unwrap_or_default();
        let mut chosen: Vec<BranchQuestion> = match selected {
            None => suggested,
            Some(selected) => suggested
                .into_iter()
                .filter(|q| selected.iter().any(|s| *s == q.id || *s == q.text))
                .collect(),
        };
        chosen.truncate(self.max_branch_questions);

        let first = chosen.first().map(BranchQuestion::to_question);
        self.state.suggested_branches = Some(chosen);

        match first {
            Some(question) => {
                self.state.status = InterviewStatus::Branching;
                tracing::info!(session = %self.state.id, "branching started");
                Ok(NextStep::Question(question))
            }
            None => Ok(self.complete()),
        }
    }

    /// Move any non-terminal session to `abandoned`.
    pub fn abandon(&mut self) -> Result<(), InterviewError> {
        if self.state.status.is_terminal() {
            return Err(self.illegal("abandon"));
        }
        self.state.status = InterviewStatus::Abandoned;
        tracing::info!(session = %self.state.id, "interview abandoned");
        Ok(())
    }

    fn complete(&mut self) -> NextStep {
        self.state.status = InterviewStatus::Completed;
        self.state.completed_at = Some(Utc::now());
        let output = build_output(&self.state);

        tracing::info!(
            session = %self.state.id,
            questions = output.metadata.questions_answered,
            facts = output.metadata.facts_extracted,
            branched = output.metadata.branched,
            "interview completed"
        );
        NextStep::Completed(Box::new(output))
    }

    fn illegal(&self, operation: &'static str) -> InterviewError {
        InterviewError::IllegalTransition {
            operation,
            status: self.state.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionError, DisabledProvider};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns canned replies in order, then fails.
    struct Scripted(Mutex<VecDeque<String>>);

    #[async_trait]
    impl CompletionProvider for Scripted {
        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(CompletionError::Disabled)
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    const BRANCHES: &str = r#"{"summary":"A data engineer.","questions":[
        {"text":"Which warehouse do you use?","intent":"tools","rationale":"unclear","explores":"clarification"},
        {"text":"What does your team look like?","intent":"team","rationale":"never covered","explores":"gap"}
    ]}"#;

    fn conductor(replies: &[&str]) -> InterviewConductor {
        let provider = Scripted(Mutex::new(replies.iter().map(|r| r.to_string()).collect()));
        InterviewConductor::new("s-1", Arc::new(provider), &InterviewConfig::default())
    }

    fn supplied(content: &str) -> Vec<SuppliedFact> {
        vec![SuppliedFact {
            category: "core".into(),
            content: content.into(),
            confidence: None,
            visibility: None,
            evidence: None,
        }]
    }

    async fn answer_core(c: &mut InterviewConductor) -> NextStep {
        let mut last = None;
        for i in 0..4 {
            let outcome = c
                .answer_with_facts("a reasonably long answer", supplied(&format!("fact {i}")))
                .await
                .unwrap();
            last = Some(outcome.next);
        }
        last.unwrap()
    }

    #[tokio::test]
    async fn start_only_once() {
        let mut c = conductor(&[]);
        let first = c.start().unwrap();
        assert_eq!(first.id, "core-identity");
        assert_eq!(c.status(), InterviewStatus::InProgress);
        assert!(matches!(
            c.start(),
            Err(InterviewError::IllegalTransition { operation: "start", .. })
        ));
    }

    #[tokio::test]
    async fn answer_before_start_is_illegal() {
        let mut c = conductor(&[]);
        let err = c.answer("hello there friend").await.unwrap_err();
        assert!(matches!(err, InterviewError::IllegalTransition { .. }));
        assert!(c.state().core_exchanges.is_empty());
    }

    #[tokio::test]
    async fn core_questions_then_branch_decision() {
        let mut c = conductor(&[BRANCHES]);
        c.start().unwrap();

        let next = answer_core(&mut c).await;
        assert_eq!(c.status(), InterviewStatus::AwaitingBranchDecision);
        match next {
            NextStep::BranchDecision { summary, suggested } => {
                assert_eq!(summary, "A data engineer.");
                assert_eq!(suggested.len(), 2);
            }
            other => panic!("expected branch decision, got {other:?}"),
        }
        assert_eq!(c.state().all_facts, c.state().facts_from_exchanges());
        assert_eq!(c.state().all_facts.len(), 4);
    }

    #[tokio::test]
    async fn answer_while_awaiting_decision_is_illegal() {
        let mut c = conductor(&[BRANCHES]);
        c.start().unwrap();
        answer_core(&mut c).await;

        let before = c.state().clone();
        let err = c.answer("another long answer here").await.unwrap_err();
        assert!(matches!(
            err,
            InterviewError::IllegalTransition {
                status: InterviewStatus::AwaitingBranchDecision,
                ..
            }
        ));
        assert_eq!(c.state(), &before);
    }

    #[tokio::test]
    async fn branch_failure_yields_empty_suggestions() {
        let mut c = conductor(&[]);
        c.start().unwrap();
        answer_core(&mut c).await;

        assert_eq!(c.status(), InterviewStatus::AwaitingBranchDecision);
        assert_eq!(c.state().suggested_branches.as_deref(), Some(&[][..]));
        assert!(c.state().summary.is_none());

        let next = c
            .decide_branching(BranchDecision::Continue {
                selected_questions: None,
            })
            .unwrap();
        assert!(matches!(next, NextStep::Completed(_)));
        assert_eq!(c.status(), InterviewStatus::Completed);
    }

    #[tokio::test]
    async fn done_completes_with_four_answers() {
        let mut c = conductor(&[BRANCHES]);
        c.start().unwrap();
        answer_core(&mut c).await;

        let NextStep::Completed(output) = c.decide_branching(BranchDecision::Done).unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(c.status(), InterviewStatus::Completed);
        assert_eq!(output.metadata.questions_answered, 4);
        assert!(!output.metadata.branched);
        assert_eq!(output.transcript.len(), 4);
        assert!(c.state().completed_at.is_some());
    }

    #[tokio::test]
    async fn continue_with_selection_then_complete() {
        let mut c = conductor(&[BRANCHES]);
        c.start().unwrap();
        answer_core(&mut c).await;

        let next = c
            .decide_branching(BranchDecision::Continue {
                selected_questions: Some(vec!["branch-2".into()]),
            })
            .unwrap();
        let NextStep::Question(q) = next else {
            panic!("expected a branch question");
        };
        assert_eq!(q.text, "What does your team look like?");
        assert_eq!(c.status(), InterviewStatus::Branching);

        let outcome = c
            .answer_with_facts("five people, fully remote", supplied("Team of five"))
            .await
            .unwrap();
        let NextStep::Completed(output) = outcome.next else {
            panic!("expected completion");
        };
        assert_eq!(output.metadata.questions_answered, 5);
        assert!(output.metadata.branched);
        assert_eq!(c.state().all_facts.last().unwrap().content, "Team of five");
    }

    #[tokio::test]
    async fn continue_truncates_to_configured_max() {
        let provider = Scripted(Mutex::new(VecDeque::from([BRANCHES.to_string()])));
        let config = InterviewConfig {
            max_branch_questions: 1,
            ..Default::default()
        };
        let mut c = InterviewConductor::new("s-2", Arc::new(provider), &config);
        c.start().unwrap();
        answer_core(&mut c).await;

        c.decide_branching(BranchDecision::Continue {
            selected_questions: None,
        })
        .unwrap();
        assert_eq!(c.state().suggested_branches.as_ref().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn decide_outside_decision_point_is_illegal() {
        let mut c = conductor(&[]);
        c.start().unwrap();
        assert!(matches!(
            c.decide_branching(BranchDecision::Done),
            Err(InterviewError::IllegalTransition { .. })
        ));
    }

    #[tokio::test]
    async fn abandon_from_non_terminal_only() {
        let mut c = InterviewConductor::new(
            "s-3",
            Arc::new(DisabledProvider),
            &InterviewConfig::default(),
        );
        c.start().unwrap();
        c.abandon().unwrap();
        assert_eq!(c.status(), InterviewStatus::Abandoned);
        assert!(c.abandon().is_err());
        assert!(c.answer("too late for this").await.is_err());
    }

    #[tokio::test]
    async fn restored_state_resumes_at_same_question() {
        let mut original = conductor(&[]);
        original.start().unwrap();
        original
            .answer_with_facts("I build databases at Acme", supplied("Works at Acme"))
            .await
            .unwrap();

        let json = serde_json::to_string(original.state()).unwrap();
        let state: InterviewState = serde_json::from_str(&json).unwrap();
        let mut restored =
            InterviewConductor::from_state(state, Arc::new(DisabledProvider), &InterviewConfig::default());

        assert_eq!(restored.pending_question(), original.pending_question());
        assert_eq!(restored.pending_question().unwrap().id, "core-expertise");

        let a = original
            .answer_with_facts("Rust and Postgres mostly", supplied("Uses Rust"))
            .await
            .unwrap();
        let b = restored
            .answer_with_facts("Rust and Postgres mostly", supplied("Uses Rust"))
            .await
            .unwrap();
        assert_eq!(a.next, b.next);
        assert_eq!(original.state().all_facts, restored.state().all_facts);
        assert_eq!(original.state().status, restored.state().status);
    }
}
