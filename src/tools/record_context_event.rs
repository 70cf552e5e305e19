use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecordContextEventParams {
    #[schemars(description = "Something learned about the user, as a short sentence")]
    pub content: String,

    #[schemars(description = "Where this was learned, e.g. 'browser' or 'chat'")]
    pub source: Option<String>,
}
