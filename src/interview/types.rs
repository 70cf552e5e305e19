//! Interview data model.
//!
//! [`InterviewState`] is the single serializable source of truth for a
//! session. It deliberately carries no cursor: the pending question is always
//! derived from how many exchanges exist (see
//! [`InterviewConductor`](super::conductor::InterviewConductor)).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fact::ExtractedFact;

/// Which part of the interview a question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionPhase {
    Core,
    Branching,
}

/// Why a branch question was proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Explores {
    /// Something the core answers never touched.
    Gap,
    /// A thread worth following further.
    Depth,
    /// An answer that was ambiguous or contradictory.
    Clarification,
}

impl Explores {
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "gap" => Self::Gap,
            "clarification" => Self::Clarification,
            _ => Self::Depth,
        }
    }
}

/// A question as presented to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewQuestion {
    pub id: String,
    pub phase: QuestionPhase,
    pub text: String,
    pub intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nudge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explores: Option<Explores>,
}

/// A follow-up question generated after the core questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchQuestion {
    pub id: String,
    pub text: String,
    pub intent: String,
    pub rationale: String,
    pub explores: Explores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nudge: Option<String>,
}

impl BranchQuestion {
    pub fn to_question(&self) -> InterviewQuestion {
        InterviewQuestion {
            id: self.id.clone(),
            phase: QuestionPhase::Branching,
            text: self.text.clone(),
            intent: self.intent.clone(),
            nudge: self.nudge.clone(),
            rationale: Some(self.rationale.clone()),
            explores: Some(self.explores),
        }
    }
}

/// One answered question. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewExchange {
    pub question: InterviewQuestion,
    pub answer: String,
    pub facts: Vec<ExtractedFact>,
    pub timestamp: DateTime<Utc>,
    /// Milliseconds since the previous exchange (or since the interview started).
    pub duration_ms: u64,
}

/// Session lifecycle.
///
/// `not_started → in_progress → awaiting_branch_decision → branching → completed`,
/// with `abandoned` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    NotStarted,
    InProgress,
    AwaitingBranchDecision,
    Branching,
    Completed,
    Abandoned,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::AwaitingBranchDecision => "awaiting_branch_decision",
            Self::Branching => "branching",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }
}

impl std::fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete session state. Serialized between turns and restored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewState {
    pub id: String,
    pub status: InterviewStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub core_exchanges: Vec<InterviewExchange>,
    #[serde(default)]
    pub branch_exchanges: Vec<InterviewExchange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_branches: Option<Vec<BranchQuestion>>,
    /// Facts of every core exchange, then every branch exchange, in arrival order.
    #[serde(default)]
    pub all_facts: Vec<ExtractedFact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl InterviewState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: InterviewStatus::NotStarted,
            started_at: Utc::now(),
            completed_at: None,
            core_exchanges: Vec::new(),
            branch_exchanges: Vec::new(),
            suggested_branches: None,
            all_facts: Vec::new(),
            summary: None,
        }
    }

    /// Core exchanges followed by branch exchanges.
    pub fn exchanges(&self) -> impl Iterator<Item = &InterviewExchange> {
        self.core_exchanges.iter().chain(self.branch_exchanges.iter())
    }

    /// `all_facts` recomputed from the exchanges.
    pub fn facts_from_exchanges(&self) -> Vec<ExtractedFact> {
        self.exchanges().flat_map(|e| e.facts.iter().cloned()).collect()
    }

    pub fn questions_answered(&self) -> usize {
        self.core_exchanges.len() + self.branch_exchanges.len()
    }
}

/// The caller's answer at the branch decision point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BranchDecision {
    Done,
    Continue {
        /// Ids (or exact texts) of the suggested questions to ask. `None` keeps all.
        #[serde(default, rename = "selectedQuestions", skip_serializing_if = "Option::is_none")]
        selected_questions: Option<Vec<String>>,
    },
}

// ── Identity record ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertiseLevel {
    Beginner,
    Intermediate,
    Expert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseLength {
    Concise,
    Detailed,
    Adaptive,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreIdentity {
    pub name: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertiseProfile {
    pub domains: Vec<String>,
    pub technologies: Vec<String>,
    pub level: ExpertiseLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub style: Option<String>,
    pub response_length: ResponseLength,
    pub formatting: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkContext {
    pub focus: Option<String>,
    pub projects: Vec<String>,
    pub constraints: Vec<String>,
}

/// Structured identity derived from interview facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub core: CoreIdentity,
    pub expertise: ExpertiseProfile,
    pub preferences: Preferences,
    pub context: WorkContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub phase: QuestionPhase,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputMetadata {
    pub duration_ms: u64,
    pub questions_answered: usize,
    pub core_questions: usize,
    pub branch_questions: usize,
    pub facts_extracted: usize,
    pub branched: bool,
}

/// Terminal artifact of a completed interview. Built exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewOutput {
    pub session_id: String,
    pub identity: Identity,
    pub transcript: Vec<TranscriptEntry>,
    pub facts: Vec<ExtractedFact>,
    pub metadata: OutputMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_serializes_with_camel_case_keys() {
        let state = InterviewState::new("s-1");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "not_started");
        assert!(json.get("coreExchanges").is_some());
        assert!(json.get("allFacts").is_some());
        assert!(json.get("suggestedBranches").is_none());
    }

    #[test]
    fn branch_decision_wire_format() {
        let done: BranchDecision = serde_json::from_str(r#"{"type":"done"}"#).unwrap();
        assert_eq!(done, BranchDecision::Done);

        let all: BranchDecision = serde_json::from_str(r#"{"type":"continue"}"#).unwrap();
        assert_eq!(
            all,
            BranchDecision::Continue {
                selected_questions: None
            }
        );

        let some: BranchDecision =
            serde_json::from_str(r#"{"type":"continue","selectedQuestions":["branch-2"]}"#)
                .unwrap();
        assert_eq!(
            some,
            BranchDecision::Continue {
                selected_questions: Some(vec!["branch-2".into()])
            }
        );
    }

    #[test]
    fn terminal_statuses() {
        assert!(InterviewStatus::Completed.is_terminal());
        assert!(InterviewStatus::Abandoned.is_terminal());
        assert!(!InterviewStatus::AwaitingBranchDecision.is_terminal());
    }
}
