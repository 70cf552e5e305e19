//! Follow-up question generation.
//!
//! Runs once, when the last core question has been answered. Produces a short
//! narrative summary and up to [`MAX_SUGGESTED_BRANCHES`] follow-ups. Failure
//! yields no questions and an empty summary, which the conductor handles the
//! same way as the user declining to continue.

use std::sync::Arc;

use serde::Deserialize;

use super::json_slice;
use super::types::{BranchQuestion, Explores, InterviewExchange};
use crate::completion::CompletionProvider;
use crate::fact::ExtractedFact;

pub const MAX_SUGGESTED_BRANCHES: usize = 3;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchSuggestions {
    pub summary: String,
    pub questions: Vec<BranchQuestion>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSuggestions {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    questions: Vec<RawBranch>,
}

#[derive(Debug, Deserialize)]
struct RawBranch {
    #[serde(default)]
    text: String,
    #[serde(default)]
    intent: String,
    #[serde(default)]
    rationale: String,
    #[serde(default)]
    explores: String,
    #[serde(default)]
    nudge: Option<String>,
}

pub struct BranchQuestionGenerator {
    provider: Arc<dyn CompletionProvider>,
}

impl BranchQuestionGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub async fn generate(
        &self,
        exchanges: &[InterviewExchange],
        facts: &[ExtractedFact],
    ) -> BranchSuggestions {
        let prompt = build_branch_prompt(exchanges, facts);

        let reply = match self.provider.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), error = %e, "branch generation call failed");
                return BranchSuggestions {
                    error: Some(e.to_string()),
                    ..Default::default()
                };
            }
        };

        match parse_branch_response(&reply) {
            Ok(suggestions) => {
                tracing::info!(count = suggestions.questions.len(), "branch questions generated");
                suggestions
            }
            Err(e) => {
                tracing::warn!(error = %e, "unparseable branch reply");
                BranchSuggestions {
                    error: Some(e),
                    ..Default::default()
                }
            }
        }
    }
}

pub fn build_branch_prompt(exchanges: &[InterviewExchange], facts: &[ExtractedFact]) -> String {
    let transcript = exchanges
        .iter()
        .map(|e| format!("Q: {}\nA: {}", e.question.text, e.answer))
        .collect::<Vec<_>>()
        .join("\n\n");

    let facts = if facts.is_empty() {
        "(none)".to_string()
    } else {
        facts
            .iter()
            .map(|f| format!("- [{}] {} ({:.1})", f.category, f.content, f.confidence))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You just interviewed a user so AI assistants can personalize their help.

Transcript:
{transcript}

Facts learned so far:
{facts}

Write a two or three sentence summary of who this user is, then propose 2-3 follow-up
questions. Each question explores one of:
- gap: something important that was never covered
- depth: a thread worth following further
- clarification: something ambiguous or contradictory

Reply with only a JSON object:
{{"summary":"...","questions":[{{"text":"...","intent":"...","rationale":"...","explores":"gap","nudge":"..."}}]}}"#
    )
}

/// Parse the generator reply. Questions without text are skipped; ids are
/// assigned by position (`branch-1`, `branch-2`, ...).
pub fn parse_branch_response(reply: &str) -> Result<BranchSuggestions, String> {
    let json = json_slice(reply, '{', '}').ok_or("no JSON object in reply")?;
    let raw: RawSuggestions =
        serde_json::from_str(json).map_err(|e| format!("invalid branch JSON: {e}"))?;

    let questions = raw
        .questions
        .into_iter()
        .filter(|q| !q.text.trim().is_empty())
        .take(MAX_SUGGESTED_BRANCHES)
        .enumerate()
        .map(|(i, q)| BranchQuestion {
            id: format!("branch-{}", i + 1),
            text: q.text.trim().to_string(),
            intent: q.intent,
            rationale: q.rationale,
            explores: Explores::parse_lenient(&q.explores),
            nudge: q.nudge.filter(|n| !n.trim().is_empty()),
        })
        .collect();

    Ok(BranchSuggestions {
        summary: raw.summary.trim().to_string(),
        questions,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_caps_questions() {
        let reply = r#"{
            "summary": "A Rust developer focused on storage engines.",
            "questions": [
                {"text": "What storage engines have you built?", "intent": "depth", "rationale": "mentioned storage", "explores": "depth"},
                {"text": "", "explores": "gap"},
                {"text": "Where are you based?", "intent": "location", "rationale": "never said", "explores": "GAP"},
                {"text": "Did you mean async or sync IO?", "rationale": "ambiguous", "explores": "clarification"},
                {"text": "A fourth real question?", "explores": "nonsense"}
            ]
        }"#;
        let parsed = parse_branch_response(reply).unwrap();
        assert_eq!(parsed.summary, "A Rust developer focused on storage engines.");
        assert_eq!(parsed.questions.len(), 3);
        assert_eq!(parsed.questions[0].id, "branch-1");
        assert_eq!(parsed.questions[1].explores, Explores::Gap);
        assert_eq!(parsed.questions[2].explores, Explores::Clarification);
        assert_eq!(parsed.questions[2].id, "branch-3");
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_branch_response("no thanks").is_err());
        assert!(parse_branch_response("{broken").is_err());
    }

    #[test]
    fn prompt_contains_transcript() {
        let prompt = build_branch_prompt(&[], &[]);
        assert!(prompt.contains("Facts learned so far:\n(none)"));
    }
}
