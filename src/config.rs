use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TesseraConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub completion: CompletionConfig,
    pub interview: InterviewConfig,
    pub injection: InjectionConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompletionConfig {
    /// `"anthropic"`, `"openai"`, or `"disabled"`.
    pub provider: String,
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InterviewConfig {
    pub max_branch_questions: usize,
    pub min_answer_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InjectionConfig {
    pub fact_budget_chars: usize,
    pub event_budget_chars: usize,
    pub half_life_days: f64,
    pub min_effective_confidence: f64,
    pub event_similarity_threshold: f64,
    pub fact_overlap_threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub url: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            host: "127.0.0.1".into(),
            port: 7411,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_tessera_dir()
            .join("tessera.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".into(),
            model: "claude-3-5-haiku-latest".into(),
            base_url: "https://api.anthropic.com/v1".into(),
            api_key_env: "ANTHROPIC_API_KEY".into(),
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            max_branch_questions: 3,
            min_answer_chars: 10,
        }
    }
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            fact_budget_chars: 4000,
            event_budget_chars: 2000,
            half_life_days: 60.0,
            min_effective_confidence: 0.3,
            event_similarity_threshold: 0.7,
            fact_overlap_threshold: 0.7,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            api_key_env: "TESSERA_REMOTE_KEY".into(),
            timeout_secs: 5,
        }
    }
}

/// Returns `~/.tessera/`
pub fn default_tessera_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".tessera")
}

/// Returns the default config file path: `~/.tessera/config.toml`
pub fn default_config_path() -> PathBuf {
    default_tessera_dir().join("config.toml")
}

impl TesseraConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            TesseraConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TESSERA_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("TESSERA_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("TESSERA_COMPLETION_PROVIDER") {
            self.completion.provider = val;
        }
        if let Ok(val) = std::env::var("TESSERA_REMOTE_URL") {
            self.remote.url = val;
            self.remote.enabled = true;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TesseraConfig::default();
        assert_eq!(config.server.transport, "stdio");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.interview.max_branch_questions, 3);
        assert_eq!(config.injection.fact_budget_chars, 4000);
        assert_eq!(config.injection.event_budget_chars, 2000);
        assert!(!config.remote.enabled);
        assert!(config.storage.db_path.ends_with("tessera.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"

[completion]
provider = "disabled"

[injection]
fact_budget_chars = 1000
"#;
        let config: TesseraConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.completion.provider, "disabled");
        assert_eq!(config.injection.fact_budget_chars, 1000);
        // defaults still apply for unset fields
        assert_eq!(config.injection.half_life_days, 60.0);
        assert_eq!(config.interview.min_answer_chars, 10);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = TesseraConfig::default();
        std::env::set_var("TESSERA_DB", "/tmp/override.db");
        std::env::set_var("TESSERA_LOG_LEVEL", "trace");
        std::env::set_var("TESSERA_REMOTE_URL", "https://example.test/rest/v1");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.server.log_level, "trace");
        assert_eq!(config.remote.url, "https://example.test/rest/v1");
        assert!(config.remote.enabled);

        // Clean up
        std::env::remove_var("TESSERA_DB");
        std::env::remove_var("TESSERA_LOG_LEVEL");
        std::env::remove_var("TESSERA_REMOTE_URL");
    }
}
