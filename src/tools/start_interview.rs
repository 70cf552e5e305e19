use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct StartInterviewParams {
    #[schemars(description = "Session id of an unfinished interview to abandon before starting over")]
    pub replace_session: Option<String>,
}
