//! Time decay and maturity ranking of identity facts.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::fact::IdentityFact;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A fact together with its confidence after decay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredFact {
    #[serde(flatten)]
    pub fact: IdentityFact,
    pub effective_confidence: f64,
}

/// `confidence * 0.5^(days / half_life)`. Validation timestamps in the
/// future count as zero days; a non-positive half-life disables decay.
pub fn effective_confidence(fact: &IdentityFact, now: DateTime<Utc>, half_life_days: f64) -> f64 {
    if half_life_days <= 0.0 {
        return fact.confidence;
    }
    let elapsed = (now - fact.last_validated).num_milliseconds().max(0) as f64;
    let days = elapsed / MILLIS_PER_DAY;
    fact.confidence * 0.5_f64.powf(days / half_life_days)
}

/// Score every fact, drop those at or below `min_effective`, and order the
/// rest proven first, then established, then candidate. Input order is kept
/// within a maturity level.
pub fn decay_and_rank(
    facts: Vec<IdentityFact>,
    now: DateTime<Utc>,
    half_life_days: f64,
    min_effective: f64,
) -> Vec<ScoredFact> {
    let mut scored: Vec<ScoredFact> = facts
        .into_iter()
        .filter_map(|fact| {
            let effective_confidence = effective_confidence(&fact, now, half_life_days);
            if effective_confidence <= min_effective {
                tracing::debug!(id = %fact.id, effective_confidence, "fact decayed below threshold");
                return None;
            }
            Some(ScoredFact {
                fact,
                effective_confidence,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.fact.maturity.cmp(&a.fact.maturity));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::{FactCategory, Maturity};
    use chrono::Duration;

    fn fact(content: &str, confidence: f64, age_days: i64, maturity: Maturity) -> IdentityFact {
        let mut f = IdentityFact::candidate(content, FactCategory::Context, confidence);
        f.last_validated = Utc::now() - Duration::days(age_days);
        f.maturity = maturity;
        f
    }

    #[test]
    fn two_half_lives_quarter_the_confidence() {
        let now = Utc::now();
        let mut f = fact("x", 0.8, 0, Maturity::Candidate);
        f.last_validated = now - Duration::days(120);
        let value = effective_confidence(&f, now, 60.0);
        assert!((value - 0.2).abs() < 1e-9, "got {value}");

        f.last_validated = now;
        assert!((effective_confidence(&f, now, 60.0) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn stale_facts_are_dropped() {
        let kept = decay_and_rank(
            vec![
                fact("old", 0.8, 120, Maturity::Proven),
                fact("fresh", 0.8, 0, Maturity::Candidate),
            ],
            Utc::now(),
            60.0,
            0.3,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].fact.content, "fresh");
    }

    #[test]
    fn threshold_is_exclusive() {
        let now = Utc::now();
        let mut f = fact("edge", 0.3, 0, Maturity::Candidate);
        f.last_validated = now;
        assert!(decay_and_rank(vec![f], now, 60.0, 0.3).is_empty());
    }

    #[test]
    fn ranks_by_maturity_and_keeps_order_within_level() {
        let ranked = decay_and_rank(
            vec![
                fact("c1", 0.9, 0, Maturity::Candidate),
                fact("p1", 0.9, 0, Maturity::Proven),
                fact("e1", 0.9, 0, Maturity::Established),
                fact("c2", 0.9, 0, Maturity::Candidate),
                fact("p2", 0.9, 0, Maturity::Proven),
            ],
            Utc::now(),
            60.0,
            0.3,
        );
        let order: Vec<_> = ranked.iter().map(|s| s.fact.content.as_str()).collect();
        assert_eq!(order, ["p1", "p2", "e1", "c1", "c2"]);
    }
}
