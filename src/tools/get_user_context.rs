//! MCP `get_user_context` tool parameters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct GetUserContextParams {
    #[schemars(description = "Output format: 'text' (default, ready to paste into a prompt) or 'json'")]
    pub format: Option<String>,
}
