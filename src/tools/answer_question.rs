//! MCP `answer_question` tool parameters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use tessera::interview::extractor::SuppliedFact;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AnswerQuestionParams {
    #[schemars(description = "Session id returned by start_interview")]
    pub session_id: String,

    #[schemars(description = "The user's answer to the pending question, verbatim")]
    pub answer: String,

    /// Supplying facts skips the server-side model call.
    #[schemars(
        description = "Facts you already extracted from the answer. When present, the server uses them as-is instead of calling its own model."
    )]
    pub facts: Option<Vec<SuppliedFact>>,
}
