use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use tessera::interview::types::BranchDecision;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DecideBranchingParams {
    #[schemars(description = "Session id returned by start_interview")]
    pub session_id: String,

    #[schemars(description = "true to answer follow-up questions, false to finish now")]
    pub continue_interview: bool,

    #[schemars(
        description = "Ids (e.g. 'branch-2') or exact texts of the follow-ups to ask. Omit to ask all suggested questions."
    )]
    pub selected_questions: Option<Vec<String>>,
}

impl DecideBranchingParams {
    pub fn decision(&self) -> BranchDecision {
        if self.continue_interview {
            BranchDecision::Continue {
                selected_questions: self.selected_questions.clone(),
            }
        } else {
            BranchDecision::Done
        }
    }
}
