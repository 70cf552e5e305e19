//! Places identity facts and context events are read from at injection time.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::config::RemoteConfig;
use crate::fact::{clamp_confidence, ContextEvent, FactCategory, IdentityFact, Maturity};
use crate::store::SqliteStore;

/// How many recent events a source hands to the merge.
pub const EVENT_WINDOW: usize = 200;

#[async_trait]
pub trait FactSource: Send + Sync {
    fn name(&self) -> &str;

    async fn load_facts(&self) -> Result<Vec<IdentityFact>>;

    async fn load_events(&self) -> Result<Vec<ContextEvent>>;
}

/// The local SQLite database.
pub struct LocalSource {
    store: SqliteStore,
}

impl LocalSource {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FactSource for LocalSource {
    fn name(&self) -> &str {
        "local"
    }

    async fn load_facts(&self) -> Result<Vec<IdentityFact>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.identity_facts())
            .await
            .context("local fact read panicked")?
    }

    async fn load_events(&self) -> Result<Vec<ContextEvent>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.context_events(EVENT_WINDOW))
            .await
            .context("local event read panicked")?
    }
}

/// A PostgREST-style HTTP endpoint exposing `identity_facts` and
/// `context_events` collections.
pub struct RemoteSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteFactRow {
    id: String,
    content: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    maturity: Option<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    validation_count: u32,
    last_validated: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RemoteEventRow {
    id: String,
    content: String,
    #[serde(default)]
    source: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<RemoteFactRow> for IdentityFact {
    fn from(row: RemoteFactRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            category: FactCategory::parse_lenient(&row.category),
            maturity: row
                .maturity
                .and_then(|m| m.parse::<Maturity>().ok())
                .unwrap_or(Maturity::Candidate),
            confidence: clamp_confidence(row.confidence),
            validation_count: row.validation_count,
            last_validated: row.last_validated,
        }
    }
}

impl From<RemoteEventRow> for ContextEvent {
    fn from(row: RemoteEventRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            source: row.source,
            timestamp: row.created_at,
        }
    }
}

impl RemoteSource {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// `None` when the remote store is disabled or has no URL.
    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>> {
        if !config.enabled || config.url.trim().is_empty() {
            return Ok(None);
        }
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!(env = %config.api_key_env, "remote store enabled without an API key");
        }
        Self::new(
            config.url.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, path_and_query: &str) -> Result<Vec<T>> {
        let url = format!("{}/{path_and_query}", self.base_url);
        let mut request = self.client.get(&url).header("accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        let status = response.status();
        let body = response.text().await.context("failed to read response body")?;
        anyhow::ensure!(status.is_success(), "remote returned HTTP {status}: {body}");

        serde_json::from_str(&body).with_context(|| format!("unexpected payload from {url}"))
    }
}

#[async_trait]
impl FactSource for RemoteSource {
    fn name(&self) -> &str {
        "remote"
    }

    async fn load_facts(&self) -> Result<Vec<IdentityFact>> {
        let rows: Vec<RemoteFactRow> = self.fetch("identity_facts?select=*").await?;
        Ok(rows.into_iter().map(IdentityFact::from).collect())
    }

    async fn load_events(&self) -> Result<Vec<ContextEvent>> {
        let rows: Vec<RemoteEventRow> = self
            .fetch(&format!(
                "context_events?select=*&order=created_at.desc&limit={EVENT_WINDOW}"
            ))
            .await?;
        Ok(rows.into_iter().map(ContextEvent::from).collect())
    }
}

/// The local database, plus the remote store when it is enabled.
pub fn configured_sources(
    store: &SqliteStore,
    remote: &RemoteConfig,
) -> Result<Vec<Arc<dyn FactSource>>> {
    let mut sources: Vec<Arc<dyn FactSource>> = vec![Arc::new(LocalSource::new(store.clone()))];
    if let Some(remote) = RemoteSource::from_config(remote)? {
        tracing::info!(url = %remote.base_url, "remote fact source enabled");
        sources.push(Arc::new(remote));
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use std::sync::Mutex;

    #[test]
    fn remote_rows_are_normalized() {
        let rows: Vec<RemoteFactRow> = serde_json::from_str(
            r#"[{"id":"f1","content":"Uses Neovim","category":"tools","confidence":1.4,
                 "last_validated":"2026-03-01T12:00:00Z"}]"#,
        )
        .unwrap();
        let fact = IdentityFact::from(rows.into_iter().next().unwrap());
        assert_eq!(fact.category, FactCategory::Context);
        assert_eq!(fact.maturity, Maturity::Candidate);
        assert_eq!(fact.confidence, 1.0);
    }

    #[test]
    fn disabled_remote_is_none() {
        let config = RemoteConfig::default();
        assert!(RemoteSource::from_config(&config).unwrap().is_none());

        let config = RemoteConfig {
            enabled: true,
            ..RemoteConfig::default()
        };
        assert!(RemoteSource::from_config(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn local_source_reads_the_database() {
        let conn = db::open_memory_database().unwrap();
        let store = SqliteStore::new(Arc::new(Mutex::new(conn)));
        store
            .record_event(&ContextEvent::new("Reviewed a tokio PR", None))
            .unwrap();

        let source = LocalSource::new(store);
        assert!(source.load_facts().await.unwrap().is_empty());
        assert_eq!(source.load_events().await.unwrap().len(), 1);
    }

    #[test]
    fn only_local_by_default() {
        let store = SqliteStore::new(Arc::new(Mutex::new(db::open_memory_database().unwrap())));
        let sources = configured_sources(&store, &RemoteConfig::default()).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name(), "local");
    }

    #[tokio::test]
    async fn unreachable_remote_is_an_error() {
        let source =
            RemoteSource::new("http://127.0.0.1:9", None, Duration::from_millis(500)).unwrap();
        assert!(source.load_facts().await.is_err());
    }
}
