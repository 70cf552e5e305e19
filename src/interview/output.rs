//! Output builder: maps accumulated facts into an [`Identity`] and into
//! durable [`IdentityFact`] records.
//!
//! Field mapping is keyword search over same-category facts, expressed as an
//! ordered rule table ([`FIELD_RULES`], [`LIST_RULES`]) so each rule can be
//! tested on its own. Keywords match whole words (a trailing `*` marks a
//! stem). The first fact matching any keyword wins; a rule with
//! `fallback_first` takes the first unclaimed fact of its categories when
//! nothing matches.

use chrono::Utc;

use super::types::{
    CoreIdentity, ExpertiseLevel, ExpertiseProfile, Identity, InterviewOutput, InterviewState,
    OutputMetadata, Preferences, ResponseLength, TranscriptEntry, WorkContext,
};
use crate::fact::{jaccard, ExtractedFact, FactCategory, IdentityFact};

/// Same-category facts at or above this similarity are duplicates.
pub const RECORD_DEDUP_THRESHOLD: f64 = 0.85;

/// Descriptive prefixes removed from company/location values, each paired
/// with the canonical prefix it maps to.
const KNOWN_PREFIXES: [(&str, &str); 4] = [
    ("works at", "Works at"),
    ("based in", "Based in"),
    ("located in", "Based in"),
    ("lives in", "Based in"),
];

const SENIORITY_KEYWORDS: [&str; 9] = [
    "senior",
    "lead",
    "principal",
    "staff",
    "architect",
    "head of",
    "director",
    "expert",
    "cto",
];

const CONCISE_KEYWORDS: [&str; 3] = ["concise*", "brief*", "short*"];
const DETAILED_KEYWORDS: [&str; 3] = ["detail*", "thorough*", "comprehensive*"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Role,
    Company,
    Location,
    Style,
    Formatting,
    Focus,
}

/// A single-valued field mapping.
#[derive(Debug)]
pub struct FieldRule {
    pub field: Field,
    pub categories: &'static [FactCategory],
    pub keywords: &'static [&'static str],
    pub fallback_first: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListField {
    Technologies,
    Projects,
    Constraints,
}

/// A multi-valued field mapping: every matching fact contributes.
#[derive(Debug)]
pub struct ListRule {
    pub field: ListField,
    pub categories: &'static [FactCategory],
    pub keywords: &'static [&'static str],
}

pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: Field::Name,
        categories: &[FactCategory::Core],
        keywords: &["name", "named", "called"],
        fallback_first: false,
    },
    FieldRule {
        field: Field::Role,
        categories: &[FactCategory::Core],
        keywords: &["role", "title", "position"],
        fallback_first: true,
    },
    FieldRule {
        field: Field::Company,
        categories: &[FactCategory::Core],
        keywords: &["works at", "company", "employ*", "organization", "organisation"],
        fallback_first: false,
    },
    FieldRule {
        field: Field::Location,
        categories: &[FactCategory::Core],
        keywords: &["based in", "located in", "lives in", "location"],
        fallback_first: false,
    },
    FieldRule {
        field: Field::Style,
        categories: &[FactCategory::Preference],
        keywords: &["style", "tone", "direct*", "casual*", "formal*", "communicat*"],
        fallback_first: true,
    },
    FieldRule {
        field: Field::Formatting,
        categories: &[FactCategory::Preference],
        keywords: &["format*", "markdown", "bullet*", "table*", "code block*", "example*"],
        fallback_first: false,
    },
    FieldRule {
        field: Field::Focus,
        categories: &[FactCategory::Focus, FactCategory::Context],
        keywords: &["focus*", "working on", "currently", "building"],
        fallback_first: true,
    },
];

pub const LIST_RULES: &[ListRule] = &[
    ListRule {
        field: ListField::Technologies,
        categories: &[FactCategory::Expertise],
        keywords: &[
            "use", "uses", "using", "language*", "framework*", "librar*", "tool*", "stack*",
            "proficient in", "writes", "writing",
        ],
    },
    ListRule {
        field: ListField::Projects,
        categories: &[FactCategory::Focus, FactCategory::Context],
        keywords: &["project*", "building", "working on", "launch*", "product*"],
    },
    ListRule {
        field: ListField::Constraints,
        categories: &[FactCategory::Context],
        keywords: &[
            "constraint*", "deadline*", "limited", "budget*", "must", "cannot", "can't",
            "restrict*", "complian*",
        ],
    },
];

/// Lowercase words of `text`; apostrophes stay inside words.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn word_matches(word: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(stem) => word.starts_with(stem),
        None => word == pattern,
    }
}

/// Whether any keyword occurs in `text` as a run of whole words. A trailing
/// `*` lets a keyword's last word match as a stem (`"communicat*"`).
fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let words = words(text);
    keywords.iter().any(|keyword| {
        let phrase: Vec<&str> = keyword.split_whitespace().collect();
        !phrase.is_empty()
            && words
                .windows(phrase.len())
                .any(|run| run.iter().zip(&phrase).all(|(w, p)| word_matches(w, p)))
    })
}

fn in_categories<'a>(
    facts: &'a [ExtractedFact],
    categories: &'a [FactCategory],
) -> impl Iterator<Item = &'a ExtractedFact> {
    categories
        .iter()
        .flat_map(move |c| facts.iter().filter(move |f| f.category == *c))
}

/// A fact some other field rule would pick by keyword.
fn claimed_elsewhere(rule: &FieldRule, fact: &ExtractedFact) -> bool {
    FIELD_RULES.iter().any(|other| {
        other.field != rule.field
            && other.categories.contains(&fact.category)
            && contains_any(&fact.content, other.keywords)
    })
}

/// Resolve a single-valued field to the fact that supplies it.
///
/// The fallback never takes a fact another field claims, so a bare
/// "works at Acme" is a company, not a role.
pub fn resolve_field(rule: &FieldRule, facts: &[ExtractedFact]) -> Option<ExtractedFact> {
    in_categories(facts, rule.categories)
        .find(|f| contains_any(&f.content, rule.keywords))
        .or_else(|| {
            if rule.fallback_first {
                in_categories(facts, rule.categories).find(|f| !claimed_elsewhere(rule, f))
            } else {
                None
            }
        })
        .cloned()
}

/// All facts matching a list rule, in arrival order.
pub fn resolve_list(rule: &ListRule, facts: &[ExtractedFact]) -> Vec<String> {
    in_categories(facts, rule.categories)
        .filter(|f| contains_any(&f.content, rule.keywords))
        .map(|f| f.content.clone())
        .collect()
}

fn field(field: Field, facts: &[ExtractedFact]) -> Option<ExtractedFact> {
    FIELD_RULES
        .iter()
        .find(|r| r.field == field)
        .and_then(|r| resolve_field(r, facts))
}

fn field_text(f: Field, facts: &[ExtractedFact]) -> Option<String> {
    field(f, facts).map(|f| f.content)
}

fn list(field: ListField, facts: &[ExtractedFact]) -> Vec<String> {
    LIST_RULES
        .iter()
        .find(|r| r.field == field)
        .map(|r| resolve_list(r, facts))
        .unwrap_or_default()
}

/// Seniority keyword (in expertise or core facts) or average expertise
/// confidence above 0.8 → expert; above 0.5 → intermediate; else beginner.
pub fn infer_expertise_level(facts: &[ExtractedFact]) -> ExpertiseLevel {
    let expertise: Vec<&ExtractedFact> = facts
        .iter()
        .filter(|f| f.category == FactCategory::Expertise)
        .collect();

    let senior = facts
        .iter()
        .filter(|f| matches!(f.category, FactCategory::Expertise | FactCategory::Core))
        .any(|f| contains_any(&f.content, &SENIORITY_KEYWORDS));

    let avg = if expertise.is_empty() {
        0.0
    } else {
        expertise.iter().map(|f| f.confidence).sum::<f64>() / expertise.len() as f64
    };

    if senior || avg > 0.8 {
        ExpertiseLevel::Expert
    } else if avg > 0.5 {
        ExpertiseLevel::Intermediate
    } else {
        ExpertiseLevel::Beginner
    }
}

pub fn infer_response_length(facts: &[ExtractedFact]) -> ResponseLength {
    let text = facts
        .iter()
        .filter(|f| f.category == FactCategory::Preference)
        .map(|f| f.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    if contains_any(&text, &CONCISE_KEYWORDS) {
        ResponseLength::Concise
    } else if contains_any(&text, &DETAILED_KEYWORDS) {
        ResponseLength::Detailed
    } else {
        ResponseLength::Adaptive
    }
}

/// Map a fact list into the structured identity.
pub fn build_identity(facts: &[ExtractedFact]) -> Identity {
    let technologies = list(ListField::Technologies, facts);
    let domains = facts
        .iter()
        .filter(|f| f.category == FactCategory::Expertise && !technologies.contains(&f.content))
        .map(|f| f.content.clone())
        .collect();

    Identity {
        core: CoreIdentity {
            name: field_text(Field::Name, facts),
            role: field_text(Field::Role, facts),
            company: field_text(Field::Company, facts),
            location: field_text(Field::Location, facts),
        },
        expertise: ExpertiseProfile {
            domains,
            technologies,
            level: infer_expertise_level(facts),
        },
        preferences: Preferences {
            style: field_text(Field::Style, facts),
            response_length: infer_response_length(facts),
            formatting: field_text(Field::Formatting, facts),
        },
        context: WorkContext {
            focus: field_text(Field::Focus, facts),
            projects: list(ListField::Projects, facts),
            constraints: list(ListField::Constraints, facts),
        },
    }
}

/// Build the terminal output from a completed state.
pub fn build_output(state: &InterviewState) -> InterviewOutput {
    let completed_at = state.completed_at.unwrap_or_else(Utc::now);
    let duration_ms = (completed_at - state.started_at).num_milliseconds().max(0) as u64;

    let transcript = state
        .exchanges()
        .map(|e| TranscriptEntry {
            phase: e.question.phase,
            question: e.question.text.clone(),
            answer: e.answer.clone(),
        })
        .collect();

    InterviewOutput {
        session_id: state.id.clone(),
        identity: build_identity(&state.all_facts),
        transcript,
        facts: state.all_facts.clone(),
        metadata: OutputMetadata {
            duration_ms,
            questions_answered: state.questions_answered(),
            core_questions: state.core_exchanges.len(),
            branch_questions: state.branch_exchanges.len(),
            facts_extracted: state.all_facts.len(),
            branched: !state.branch_exchanges.is_empty(),
        },
    }
}

/// The known prefix `text` starts with, ending at a word boundary.
fn leading_prefix(text: &str) -> Option<(&'static str, &'static str)> {
    KNOWN_PREFIXES.into_iter().find(|(prefix, _)| {
        text.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
            && text[prefix.len()..]
                .chars()
                .next()
                .map_or(true, char::is_whitespace)
    })
}

/// Remove known descriptive prefixes until none remain.
///
/// `"works at works at Acme"` → `"Acme"`.
pub fn strip_known_prefixes(value: &str) -> String {
    let mut rest = value.trim();
    while let Some((prefix, _)) = leading_prefix(rest) {
        rest = rest[prefix.len()..].trim_start();
    }
    rest.to_string()
}

/// Rewrite a prefixed core fact with its canonical prefix:
/// `"lives in Lisbon"` → `"Based in Lisbon"`.
fn canonicalize(content: &str) -> Option<String> {
    let (_, canonical) = leading_prefix(content.trim())?;
    let bare = strip_known_prefixes(content);
    (!bare.is_empty()).then(|| format!("{canonical} {bare}"))
}

/// Keep the first fact of each near-duplicate group within a category.
/// Facts in different categories are never compared.
pub fn dedup_by_category(facts: Vec<IdentityFact>, threshold: f64) -> Vec<IdentityFact> {
    let mut kept: Vec<IdentityFact> = Vec::with_capacity(facts.len());
    for fact in facts {
        let duplicate = kept
            .iter()
            .any(|k| k.category == fact.category && jaccard(&k.content, &fact.content) >= threshold);
        if !duplicate {
            kept.push(fact);
        }
    }
    kept
}

/// Convert an interview output into durable per-fact records.
///
/// Canonical core records (name, role, `Works at X`, `Based in X`) come
/// first, then every extracted fact, with prefixed core facts rewritten to
/// their canonical form; near-duplicates are removed last.
pub fn to_identity_facts(output: &InterviewOutput) -> Vec<IdentityFact> {
    let facts = &output.facts;
    let mut records = Vec::new();

    for (f, prefix) in [
        (Field::Name, None),
        (Field::Role, None),
        (Field::Company, Some("Works at")),
        (Field::Location, Some("Based in")),
    ] {
        let Some(source) = field(f, facts) else {
            continue;
        };
        let content = match prefix {
            Some(prefix) => {
                let bare = strip_known_prefixes(&source.content);
                if bare.is_empty() {
                    continue;
                }
                format!("{prefix} {bare}")
            }
            None => source.content.clone(),
        };
        records.push(IdentityFact::candidate(
            content,
            FactCategory::Core,
            source.confidence,
        ));
    }

    records.extend(facts.iter().map(|f| {
        let content = match f.category {
            FactCategory::Core => canonicalize(&f.content).unwrap_or_else(|| f.content.clone()),
            _ => f.content.clone(),
        };
        IdentityFact::candidate(content, f.category, f.confidence)
    }));

    dedup_by_category(records, RECORD_DEDUP_THRESHOLD)
}
