//! Plain-text rendering of an [`InjectionContext`].

use std::fmt::Write;

use super::merge::InjectionContext;

pub const FACTS_HEADING: &str = "## About this user";
pub const EVENTS_HEADING: &str = "## Recent learnings";

/// Render the non-empty sections, facts first. Returns an empty string when
/// there is nothing to say.
pub fn render_context(context: &InjectionContext) -> String {
    let mut sections = Vec::new();

    if !context.facts.is_empty() {
        let mut out = String::from(FACTS_HEADING);
        for scored in &context.facts {
            let _ = write!(out, "\n- {} ({})", scored.fact.content, scored.fact.maturity);
        }
        sections.push(out);
    }

    if !context.events.is_empty() {
        let mut out = String::from(EVENTS_HEADING);
        for event in &context.events {
            match &event.source {
                Some(source) => {
                    let _ = write!(out, "\n- {} [{}]", event.content, source);
                }
                None => {
                    let _ = write!(out, "\n- {}", event.content);
                }
            }
        }
        sections.push(out);
    }

    sections.join("\n\n")
}
