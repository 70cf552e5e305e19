//! Text-completion capability.
//!
//! The interview engine never talks to the network directly. It receives a
//! [`CompletionProvider`] (a prompt in, text out) created via
//! [`create_provider`] from configuration, so tests can substitute a
//! deterministic stand-in.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::CompletionConfig;

/// Failure modes of a completion call. The engine treats every variant the
/// same way (no facts, no branch questions); the distinction is for logs.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion provider is disabled")]
    Disabled,

    #[error("request failed: {0}")]
    Request(String),

    #[error("completion service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid completion response: {0}")]
    InvalidResponse(String),
}

/// Trait for turning a single prompt into model text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Short identifier for logs.
    fn name(&self) -> &str;
}

/// A provider that always fails. The interview still runs: extraction falls
/// back to caller-supplied facts and branching yields no suggestions.
pub struct DisabledProvider;

#[async_trait]
impl CompletionProvider for DisabledProvider {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        Err(CompletionError::Disabled)
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

/// Create a completion provider from config.
///
/// A missing API key is not an error here: the provider is downgraded to
/// [`DisabledProvider`] with a warning so the rest of the system keeps working.
pub fn create_provider(config: &CompletionConfig) -> anyhow::Result<Box<dyn CompletionProvider>> {
    let api_key = || std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());

    match config.provider.as_str() {
        "disabled" | "none" => Ok(Box::new(DisabledProvider)),
        "anthropic" | "openai" => {
            let Some(key) = api_key() else {
                tracing::warn!(
                    provider = %config.provider,
                    env = %config.api_key_env,
                    "no API key configured, completion disabled"
                );
                return Ok(Box::new(DisabledProvider));
            };
            if config.provider == "anthropic" {
                Ok(Box::new(http::AnthropicProvider::new(config, key)?))
            } else {
                Ok(Box::new(http::OpenAiProvider::new(config, key)?))
            }
        }
        other => anyhow::bail!(
            "unknown completion provider: {other}. Supported: anthropic, openai, disabled"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_provider_always_fails() {
        let provider = DisabledProvider;
        let err = provider.complete("hello").await.unwrap_err();
        assert!(matches!(err, CompletionError::Disabled));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = CompletionConfig {
            provider: "carrier-pigeon".into(),
            ..Default::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("unknown completion provider"));
    }

    #[test]
    fn missing_key_downgrades_to_disabled() {
        let config = CompletionConfig {
            provider: "openai".into(),
            api_key_env: "TESSERA_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "disabled");
    }
}
