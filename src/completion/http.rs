//! HTTP completion providers: Anthropic Messages and OpenAI-compatible chat
//! completions. Both send a single user message and return the first text
//! block of the reply.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionError, CompletionProvider};
use crate::config::CompletionConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

fn build_client(config: &CompletionConfig) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("failed to build HTTP client")
}

/// POST a JSON body and return the response text, mapping transport and
/// non-2xx failures into [`CompletionError`].
async fn post_json(
    request: reqwest::RequestBuilder,
    body: &impl Serialize,
) -> Result<String, CompletionError> {
    let body = serde_json::to_string(body)
        .map_err(|e| CompletionError::Request(format!("failed to encode request: {e}")))?;

    let response = request
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| CompletionError::Request(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| CompletionError::Request(e.to_string()))?;

    if !status.is_success() {
        return Err(CompletionError::Status {
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(text)
}

/// Anthropic Messages API provider.
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    api_key: String,
}

impl AnthropicProvider {
    pub fn new(config: &CompletionConfig, api_key: String) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_key,
        })
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let builder = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let raw = post_json(builder, &request).await?;

        let parsed: AnthropicResponse = serde_json::from_str(&raw)
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        parsed
            .content
            .into_iter()
            .find(|b| b.kind == "text")
            .and_then(|b| b.text)
            .ok_or_else(|| CompletionError::InvalidResponse("no text block in response".into()))
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

/// OpenAI-compatible `/chat/completions` provider.
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(config: &CompletionConfig, api_key: String) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_key,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("authorization", format!("Bearer {}", self.api_key));
        let raw = post_json(builder, &request).await?;

        let parsed: OpenAiResponse = serde_json::from_str(&raw)
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CompletionError::InvalidResponse("no choices in response".into()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
