//! The fixed core question list, asked in order before any branching.

use super::types::{InterviewQuestion, QuestionPhase};

struct CoreQuestion {
    id: &'static str,
    text: &'static str,
    intent: &'static str,
    nudge: &'static str,
}

const CORE: [CoreQuestion; 4] = [
    CoreQuestion {
        id: "core-identity",
        text: "Tell me about yourself: what do you do, and where?",
        intent: "Name, role, company, and location",
        nudge: "e.g. \"I'm a backend engineer at a fintech startup in Berlin\"",
    },
    CoreQuestion {
        id: "core-expertise",
        text: "What are you good at? Which domains, languages, and tools do you use most?",
        intent: "Expertise domains, technologies, and seniority",
        nudge: "Mention anything you'd want an assistant to assume you already know",
    },
    CoreQuestion {
        id: "core-preferences",
        text: "How do you like an assistant to respond to you?",
        intent: "Communication style, response length, and formatting",
        nudge: "Short and direct? Thorough with examples? Code first?",
    },
    CoreQuestion {
        id: "core-focus",
        text: "What are you working on right now, and what constraints are you under?",
        intent: "Current focus, active projects, and constraints",
        nudge: "Deadlines, stack limits, team size, anything that shapes good advice",
    },
];

/// Number of core questions.
pub const CORE_QUESTION_COUNT: usize = CORE.len();

/// The core question at `index`, or `None` once all have been asked.
pub fn core_question(index: usize) -> Option<InterviewQuestion> {
    CORE.get(index).map(|q| InterviewQuestion {
        id: q.id.to_string(),
        phase: QuestionPhase::Core,
        text: q.text.to_string(),
        intent: q.intent.to_string(),
        nudge: Some(q.nudge.to_string()),
        rationale: None,
        explores: None,
    })
}

/// All core questions in order.
pub fn core_questions() -> Vec<InterviewQuestion> {
    (0..CORE_QUESTION_COUNT).filter_map(core_question).collect()
}
