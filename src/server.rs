//! Server wiring: database, providers, service, sweeper, health endpoint,
//! and the MCP stdio transport.

use crate::config::EngramConfig;
use crate::db::Db;
use crate::embedding::{self, MultiEmbedder};
use crate::memory::service::MemoryService;
use crate::sweeper;
use crate::tools::EngramTools;
use anyhow::{Context, Result};
use rmcp::ServiceExt;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared setup: connect and migrate the database, build the providers and
/// the memory service. Used by both the server and the batch CLI.
pub async fn setup_service(config: &EngramConfig) -> Result<Arc<MemoryService>> {
    config.validate()?;

    let db = Arc::new(
        Db::connect_with(
            &config.database.url,
            &config.partition.tenant_id,
            &config.partition.workspace_id,
            config.database.max_connections,
        )
        .await
        .context("failed to connect to database")?,
    );

    db.migrate().await.context("failed to run migrations")?;
    tracing::info!(
        tenant = %config.partition.tenant_id,
        workspace = %config.partition.workspace_id,
        "database ready"
    );

    let embedder = Arc::new(
        MultiEmbedder::from_config(&config.llm).context("failed to build embedding gateway")?,
    );
    let provider = embedding::create_provider(&config.llm, embedder.primary())
        .context("failed to build LLM provider")?;
    tracing::info!(
        backend = %config.llm.backend,
        models = ?embedder.models(),
        "embedding gateway ready"
    );

    let service = MemoryService::new(db, provider, embedder)
        .with_extraction(config.llm.extract_entities);

    Ok(Arc::new(service))
}

/// Start the MCP server over stdio and block until the client disconnects
/// or a shutdown signal arrives.
pub async fn serve_stdio(config: EngramConfig) -> Result<()> {
    tracing::info!("starting engram MCP server on stdio");

    let service = setup_service(&config).await?;
    let db = Arc::clone(service.db());

    let sweeper_handle = if config.sweeper.enabled {
        let interval = config.sweeper_interval()?;
        tracing::info!(interval = %config.sweeper.interval, "TTL sweeper enabled");
        sweeper::start(Arc::clone(&db), interval)
    } else {
        None
    };

    let health_handle = match config.server.health_port {
        Some(port) => Some(spawn_health_server(port, Arc::clone(&db)).await?),
        None => None,
    };

    let tools = EngramTools::new(Arc::clone(&service));
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    tokio::select! {
        result = server.waiting() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    // Stop accepting work, then drain the background tasks and the pool.
    if let Some(handle) = sweeper_handle {
        handle.stop().await;
    }
    if let Some(handle) = health_handle {
        handle.stop().await;
    }
    db.close().await;

    tracing::info!("MCP server shut down");
    Ok(())
}

/// Handle to the background liveness endpoint.
pub struct HealthHandle {
    shutdown: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
}

impl HealthHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

/// Serve `GET /health` on the given port.
async fn spawn_health_server(port: u16, db: Arc<Db>) -> Result<HealthHandle> {
    use axum::{routing::get, Json, Router};

    let router = Router::new().route(
        "/health",
        get(move || {
            let db = Arc::clone(&db);
            async move {
                match db.ping().await {
                    Ok(()) => Json(serde_json::json!({ "status": "ok" })),
                    Err(_) => Json(serde_json::json!({ "status": "degraded" })),
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind health port {port}"))?;
    tracing::info!(port, "health endpoint listening");

    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        });
        if let Err(e) = serve.await {
            tracing::error!(error = %e, "health server error");
        }
    });

    Ok(HealthHandle { shutdown, handle })
}
