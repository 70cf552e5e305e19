//! Fact extraction from a single interview answer.
//!
//! Two paths, one output contract. When the caller already extracted facts
//! ([`SuppliedFact`]) they are normalized and returned without any external
//! call. Otherwise the question, answer, and previously extracted facts are
//! sent to the [`CompletionProvider`] and the reply is parsed as a JSON array.
//! Extraction never fails the interview: any problem yields an empty list and
//! an error string.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_slice;
use super::types::InterviewQuestion;
use crate::completion::CompletionProvider;
use crate::fact::{ExtractedFact, FactCategory, Visibility};

/// Answers shorter than this (in characters, after trimming) skip the model call.
pub const DEFAULT_MIN_ANSWER_CHARS: usize = 10;

/// Confidence assigned to caller-supplied facts that don't state one.
pub const SUPPLIED_FACT_CONFIDENCE: f64 = 0.8;

/// A fact extracted by the caller before submitting the answer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SuppliedFact {
    #[schemars(description = "One of: core, expertise, preference, context, focus")]
    pub category: String,
    #[schemars(description = "The fact, as a short statement about the user")]
    pub content: String,
    #[schemars(description = "Confidence 0.0-1.0. Defaults to 0.8.")]
    pub confidence: Option<f64>,
    #[schemars(description = "One of: public, trusted, local. Defaults to trusted.")]
    pub visibility: Option<String>,
    #[schemars(description = "Quote from the answer supporting this fact")]
    pub evidence: Option<String>,
}

impl SuppliedFact {
    fn normalize(self) -> ExtractedFact {
        ExtractedFact::new(
            FactCategory::parse_lenient(&self.category),
            self.content.trim(),
            self.confidence.unwrap_or(SUPPLIED_FACT_CONFIDENCE),
            self.visibility
                .as_deref()
                .map(Visibility::parse_lenient)
                .unwrap_or_default(),
            self.evidence.unwrap_or_default(),
        )
    }
}

/// Result of one extraction attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub facts: Vec<ExtractedFact>,
    /// Why nothing was extracted, when that happened for a reason.
    pub error: Option<String>,
}

impl Extraction {
    fn failed(reason: impl Into<String>) -> Self {
        Self {
            facts: Vec::new(),
            error: Some(reason.into()),
        }
    }
}

/// Raw shape of one fact in the model's JSON reply. Every field is optional
/// so a partially valid reply still yields what it can.
#[derive(Debug, Deserialize)]
struct RawFact {
    #[serde(default)]
    category: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    evidence: String,
    #[serde(default)]
    visibility: String,
}

pub struct FactExtractor {
    provider: Arc<dyn CompletionProvider>,
    min_answer_chars: usize,
}

impl FactExtractor {
    pub fn new(provider: Arc<dyn CompletionProvider>, min_answer_chars: usize) -> Self {
        Self {
            provider,
            min_answer_chars,
        }
    }

    /// Extract facts for one answer. `supplied` selects the fast path.
    pub async fn extract(
        &self,
        question: &InterviewQuestion,
        answer: &str,
        previous: &[ExtractedFact],
        supplied: Option<Vec<SuppliedFact>>,
    ) -> Extraction {
        if let Some(supplied) = supplied {
            let facts = supplied
                .into_iter()
                .filter(|f| !f.content.trim().is_empty())
                .map(SuppliedFact::normalize)
                .collect();
            return Extraction { facts, error: None };
        }

        let answer = answer.trim();
        if answer.chars().count() < self.min_answer_chars {
            return Extraction::failed(format!(
                "answer shorter than {} characters, nothing to extract",
                self.min_answer_chars
            ));
        }

        let prompt = build_extraction_prompt(question, answer, previous);
        let reply = match self.provider.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    question = %question.id,
                    provider = self.provider.name(),
                    error = %e,
                    "fact extraction call failed"
                );
                return Extraction::failed(e.to_string());
            }
        };

        match parse_extraction_response(&reply) {
            Ok(facts) => {
                tracing::debug!(question = %question.id, count = facts.len(), "facts extracted");
                Extraction { facts, error: None }
            }
            Err(e) => {
                tracing::warn!(question = %question.id, error = %e, "unparseable extraction reply");
                Extraction::failed(e)
            }
        }
    }
}

/// Assemble the extraction prompt.
pub fn build_extraction_prompt(
    question: &InterviewQuestion,
    answer: &str,
    previous: &[ExtractedFact],
) -> String {
    let known = if previous.is_empty() {
        "(none yet)".to_string()
    } else {
        previous
            .iter()
            .map(|f| format!("- [{}] {}", f.category, f.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are building a profile of a user so AI assistants can personalize their help.
Extract every fact you can from the user's answer below. Be aggressive:

- Explicit statements -> confidence 1.0
- Strongly implied statements -> confidence 0.8
- Context implied by their role or domain -> confidence 0.6

Categories: core (name, role, company, location), expertise (domains, technologies,
seniority), preference (how they want responses), context (projects, constraints,
circumstances), focus (what they are working on now).
Visibility: public, trusted, or local (private details stay local).

Do not repeat facts that are already known.

Known facts:
{known}

Question ({intent}): {question}
Answer: {answer}

Reply with only a JSON array, e.g.
[{{"category":"core","content":"Works at Acme","confidence":1.0,"evidence":"I work at Acme","visibility":"trusted"}}]"#,
        known = known,
        intent = question.intent,
        question = question.text,
        answer = answer,
    )
}

/// Parse the model's reply into facts. Unknown categories become `context`,
/// unknown visibilities become `trusted`, and confidences are clamped.
pub fn parse_extraction_response(reply: &str) -> Result<Vec<ExtractedFact>, String> {
    let json = json_slice(reply, '[', ']').ok_or("no JSON array in reply")?;
    let raw: Vec<RawFact> =
        serde_json::from_str(json).map_err(|e| format!("invalid fact JSON: {e}"))?;

    Ok(raw
        .into_iter()
        .filter(|r| !r.content.trim().is_empty())
        .map(|r| {
            ExtractedFact::new(
                FactCategory::parse_lenient(&r.category),
                r.content.trim(),
                r.confidence.unwrap_or(0.6),
                Visibility::parse_lenient(&r.visibility),
                r.evidence,
            )
        })
        .collect())
}
