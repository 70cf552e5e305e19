//! Core fact type definitions.
//!
//! Defines [`FactCategory`] and [`Visibility`] (the extraction-time axes),
//! [`ExtractedFact`] (a fact produced during an interview), [`Maturity`] and
//! [`IdentityFact`] (the durable, persistence-time record), and
//! [`ContextEvent`] (a loosely structured note merged at read time).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Clamp a reported confidence into `[0.0, 1.0]`. `NaN` becomes `0.0`.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// What aspect of the user a fact describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactCategory {
    /// Name, role, company, location.
    Core,
    /// Domains, technologies, skill level.
    Expertise,
    /// How the user wants assistants to respond.
    Preference,
    /// Projects, constraints, circumstances.
    Context,
    /// What the user is working on right now.
    Focus,
}

impl FactCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Expertise => "expertise",
            Self::Preference => "preference",
            Self::Context => "context",
            Self::Focus => "focus",
        }
    }

    /// Lenient parse used on best-effort extraction output. Unknown values
    /// fall back to [`FactCategory::Context`].
    pub fn parse_lenient(s: &str) -> Self {
        s.trim().to_lowercase().parse().unwrap_or(Self::Context)
    }
}

impl std::fmt::Display for FactCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FactCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core" => Ok(Self::Core),
            "expertise" => Ok(Self::Expertise),
            "preference" => Ok(Self::Preference),
            "context" => Ok(Self::Context),
            "focus" => Ok(Self::Focus),
            _ => Err(format!("unknown fact category: {s}")),
        }
    }
}

/// Who a fact may be shared with. Carried through extraction and storage;
/// no read path filters on it yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    #[default]
    Trusted,
    Local,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Trusted => "trusted",
            Self::Local => "local",
        }
    }

    /// Unknown values fall back to [`Visibility::Trusted`].
    pub fn parse_lenient(s: &str) -> Self {
        s.trim().to_lowercase().parse().unwrap_or(Self::Trusted)
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "trusted" => Ok(Self::Trusted),
            "local" => Ok(Self::Local),
            _ => Err(format!("unknown visibility: {s}")),
        }
    }
}

/// A fact extracted from one interview answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFact {
    pub category: FactCategory,
    pub content: String,
    /// Always within `[0.0, 1.0]`; see [`ExtractedFact::new`].
    pub confidence: f64,
    pub visibility: Visibility,
    /// The part of the answer that supports this fact.
    pub evidence: String,
}

impl ExtractedFact {
    pub fn new(
        category: FactCategory,
        content: impl Into<String>,
        confidence: f64,
        visibility: Visibility,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            category,
            content: content.into(),
            confidence: clamp_confidence(confidence),
            visibility,
            evidence: evidence.into(),
        }
    }
}

/// Trust tier of a persisted fact. Ordered `Candidate < Established < Proven`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maturity {
    Candidate,
    Established,
    Proven,
}

impl Maturity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Candidate => "candidate",
            Self::Established => "established",
            Self::Proven => "proven",
        }
    }
}

impl std::fmt::Display for Maturity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Maturity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "candidate" => Ok(Self::Candidate),
            "established" => Ok(Self::Established),
            "proven" => Ok(Self::Proven),
            _ => Err(format!("unknown maturity: {s}")),
        }
    }
}

/// A durable fact record. `validation_count` and `maturity` only move
/// through revalidation, which happens outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityFact {
    pub id: String,
    pub content: String,
    pub category: FactCategory,
    pub maturity: Maturity,
    pub confidence: f64,
    #[serde(default)]
    pub validation_count: u32,
    pub last_validated: DateTime<Utc>,
}

impl IdentityFact {
    /// A fresh candidate fact, validated now.
    pub fn candidate(content: impl Into<String>, category: FactCategory, confidence: f64) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            content: content.into(),
            category,
            maturity: Maturity::Candidate,
            confidence: clamp_confidence(confidence),
            validation_count: 0,
            last_validated: Utc::now(),
        }
    }
}

/// A free-form note about the user, e.g. a page summary or a learning
/// recorded by an assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEvent {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ContextEvent {
    pub fn new(content: impl Into<String>, source: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            content: content.into(),
            source,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        for (input, expected) in [(1.7, 1.0), (-0.4, 0.0), (0.6, 0.6), (f64::NAN, 0.0)] {
            let fact = ExtractedFact::new(FactCategory::Core, "x", input, Visibility::Trusted, "");
            assert_eq!(fact.confidence, expected, "input {input}");
        }
        let fact = IdentityFact::candidate("x", FactCategory::Core, 3.0);
        assert_eq!(fact.confidence, 1.0);
    }

    #[test]
    fn lenient_parse_falls_back() {
        assert_eq!(FactCategory::parse_lenient("Expertise"), FactCategory::Expertise);
        assert_eq!(FactCategory::parse_lenient("hobby"), FactCategory::Context);
        assert_eq!(Visibility::parse_lenient(" PUBLIC "), Visibility::Public);
        assert_eq!(Visibility::parse_lenient("secret"), Visibility::Trusted);
    }

    #[test]
    fn maturity_orders_by_trust() {
        assert!(Maturity::Proven > Maturity::Established);
        assert!(Maturity::Established > Maturity::Candidate);
    }

    #[test]
    fn identity_fact_uses_camel_case_on_the_wire() {
        let fact = IdentityFact::candidate("Works at Acme", FactCategory::Core, 0.9);
        let json = serde_json::to_value(&fact).unwrap();
        assert!(json.get("validationCount").is_some());
        assert!(json.get("lastValidated").is_some());
        assert_eq!(json["maturity"], "candidate");
    }
}
