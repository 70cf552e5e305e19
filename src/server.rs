//! MCP server entry points for stdio and streamable HTTP.
//!
//! [`setup_shared_state`] opens the database, builds the completion provider
//! and fact sources, and wraps everything in an [`AppState`] that every tool
//! handler clone shares.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use rmcp::ServiceExt;
use tokio::sync::Mutex as AsyncMutex;

use tessera::completion::{self, CompletionProvider};
use tessera::config::TesseraConfig;
use tessera::db;
use tessera::inject::{configured_sources, FactSource};
use tessera::interview::session::SessionManager;
use tessera::store::SqliteStore;

use crate::tools::TesseraTools;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TesseraConfig>,
    pub store: SqliteStore,
    pub sessions: Arc<AsyncMutex<SessionManager>>,
    pub sources: Arc<Vec<Arc<dyn FactSource>>>,
}

pub fn setup_shared_state(config: TesseraConfig) -> Result<AppState> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let store = SqliteStore::new(Arc::new(Mutex::new(conn)));

    let provider: Arc<dyn CompletionProvider> =
        Arc::from(completion::create_provider(&config.completion)?);
    tracing::info!(provider = provider.name(), "completion provider ready");

    let sessions = SessionManager::new(
        Arc::new(store.clone()),
        provider,
        config.interview.clone(),
    );
    let sources = configured_sources(&store, &config.remote)?;

    Ok(AppState {
        config: Arc::new(config),
        store,
        sessions: Arc::new(AsyncMutex::new(sessions)),
        sources: Arc::new(sources),
    })
}

pub async fn serve(config: TesseraConfig) -> Result<()> {
    match config.server.transport.as_str() {
        "http" => serve_http(config).await,
        "stdio" => serve_stdio(config).await,
        other => anyhow::bail!("unknown transport '{other}' (expected 'stdio' or 'http')"),
    }
}

pub async fn serve_stdio(config: TesseraConfig) -> Result<()> {
    tracing::info!("starting Tessera MCP server on stdio");

    let state = setup_shared_state(config)?;
    let server = TesseraTools::new(state).serve(rmcp::transport::stdio()).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");
    Ok(())
}

pub async fn serve_http(config: TesseraConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting Tessera MCP server on HTTP");

    let state = setup_shared_state(config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(TesseraTools::new(state.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
