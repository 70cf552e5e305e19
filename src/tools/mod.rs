pub mod answer_question;
pub mod decide_branching;
pub mod get_user_context;
pub mod record_context_event;
pub mod start_interview;

use answer_question::AnswerQuestionParams;
use decide_branching::DecideBranchingParams;
use get_user_context::GetUserContextParams;
use record_context_event::RecordContextEventParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use start_interview::StartInterviewParams;

use tessera::fact::ContextEvent;
use tessera::inject::{merge_facts_for_injection, render_context};

use crate::server::AppState;

/// MCP tool handler. Cheap to clone; every clone shares the same sessions,
/// database, and sources.
#[derive(Clone)]
pub struct TesseraTools {
    tool_router: ToolRouter<Self>,
    state: AppState,
}

#[tool_router]
impl TesseraTools {
    pub fn new(state: AppState) -> Self {
        Self {
            tool_router: Self::tool_router(),
            state,
        }
    }

    /// Begin a guided interview and return the first question.
    #[tool(description = "Start a short interview that teaches Tessera who the user is. Returns a session_id and the first question; relay each question to the user and pass their reply to answer_question.")]
    async fn start_interview(
        &self,
        Parameters(params): Parameters<StartInterviewParams>,
    ) -> Result<String, String> {
        let mut sessions = self.state.sessions.lock().await;

        if let Some(old) = params.replace_session.as_deref() {
            match sessions.abandon(old) {
                Ok(()) => tracing::info!(session = %old, "replaced session abandoned"),
                Err(e) => tracing::warn!(session = %old, error = %e, "could not abandon replaced session"),
            }
        }

        let turn = sessions.start().map_err(|e| e.to_string())?;
        tracing::info!(session = %turn.session_id, "start_interview called");

        serde_json::to_string(&turn).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Submit the user's answer to the pending question.
    #[tool(description = "Answer the pending interview question. Optionally include facts you extracted yourself. Returns the facts learned and the next step: another question, a branch decision, or the completed profile.")]
    async fn answer_question(
        &self,
        Parameters(params): Parameters<AnswerQuestionParams>,
    ) -> Result<String, String> {
        tracing::info!(
            session = %params.session_id,
            answer_len = params.answer.len(),
            supplied = params.facts.as_ref().map(Vec::len),
            "answer_question called"
        );

        let turn = self
            .state
            .sessions
            .lock()
            .await
            .answer(&params.session_id, &params.answer, params.facts)
            .await
            .map_err(|e| e.to_string())?;

        serde_json::to_string(&turn).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Choose whether to continue with follow-up questions.
    #[tool(description = "After the four core questions, choose whether to ask follow-up questions (continue_interview=true, optionally selecting some) or finish the interview.")]
    async fn decide_branching(
        &self,
        Parameters(params): Parameters<DecideBranchingParams>,
    ) -> Result<String, String> {
        let decision = params.decision();
        tracing::info!(session = %params.session_id, ?decision, "decide_branching called");

        let turn = self
            .state
            .sessions
            .lock()
            .await
            .decide_branching(&params.session_id, decision)
            .map_err(|e| e.to_string())?;

        serde_json::to_string(&turn).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Current knowledge about the user, ready for prompt injection.
    #[tool(description = "Get what is known about the user: identity facts ranked by maturity with stale ones decayed away, plus recent learnings. Use at the start of a conversation to personalize responses.")]
    async fn get_user_context(
        &self,
        Parameters(params): Parameters<GetUserContextParams>,
    ) -> Result<String, String> {
        let context =
            merge_facts_for_injection(&self.state.sources, &self.state.config.injection).await;

        match params.format.as_deref().unwrap_or("text") {
            "json" => serde_json::to_string(&serde_json::json!({
                "context": render_context(&context),
                "facts": context.facts,
                "events": context.events,
            }))
            .map_err(|e| format!("serialization failed: {e}")),
            "text" if context.is_empty() => {
                Ok("Nothing is known about this user yet. Offer to run start_interview.".into())
            }
            "text" => Ok(render_context(&context)),
            other => Err(format!("unknown format '{other}' (expected 'text' or 'json')")),
        }
    }

    /// Save a free-form observation about the user.
    #[tool(description = "Record something you learned about the user during this conversation. Shown under 'Recent learnings' in get_user_context.")]
    async fn record_context_event(
        &self,
        Parameters(params): Parameters<RecordContextEventParams>,
    ) -> Result<String, String> {
        let content = params.content.trim();
        if content.is_empty() {
            return Err("content must not be empty".into());
        }

        let event = ContextEvent::new(content, params.source);
        let store = self.state.store.clone();
        let saved = event.clone();
        tokio::task::spawn_blocking(move || store.record_event(&saved))
            .await
            .map_err(|e| format!("db task failed: {e}"))?
            .map_err(|e| format!("store failed: {e}"))?;

        tracing::info!(id = %event.id, "context event recorded");
        serde_json::to_string(&event).map_err(|e| format!("serialization failed: {e}"))
    }
}

#[tool_handler]
impl ServerHandler for TesseraTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Tessera remembers who the user is. Call get_user_context at the start of a \
                 conversation. If it is empty, offer start_interview, then relay questions and \
                 answers through answer_question and decide_branching. Use record_context_event \
                 for anything new you learn along the way."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
