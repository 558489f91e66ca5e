//! rolegraph server binary
//!
//! Serves the RBAC graph API and the natural-language command endpoint.
//!
//! # Usage
//!
//! ```bash
//! # With config file
//! rolegraph --config config.yaml
//!
//! # With environment variables only
//! ROLEGRAPH_RESOLVER__BACKEND=llm ROLEGRAPH_RESOLVER__API_KEY=... rolegraph
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use rolegraph_api::adapters::{LlmIntentResolver, LlmResolverConfig};
use rolegraph_api::http::{create_router_with_observability, AppState, HttpOptions};
use rolegraph_api::observability::{init_logging, init_metrics, LoggingConfig};
use rolegraph_domain::{IntentResolver, KeywordResolver};
use rolegraph_server::config::ResolverSettings;
use rolegraph_server::{seed_default_graph, ServerConfig};
use rolegraph_storage::MemoryGraphStore;

/// rolegraph - RBAC graph service with natural-language commands
#[derive(Parser, Debug)]
#[command(name = "rolegraph")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match args.config {
        Some(path) => ServerConfig::load(&path)?,
        None => ServerConfig::from_env()?,
    };

    init_logging(LoggingConfig::from_settings(&config.logging));
    info!(version = env!("CARGO_PKG_VERSION"), "Starting rolegraph server");

    let metrics_state = if config.metrics.enabled {
        info!(path = %config.metrics.path, "Metrics enabled");
        Some(init_metrics()?)
    } else {
        None
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let store = match config.storage.backend.as_str() {
        "memory" => {
            info!("Using in-memory storage backend");
            MemoryGraphStore::new_shared()
        }
        other => anyhow::bail!("Unknown storage backend: {other}"),
    };

    let resolver = build_resolver(&config.resolver)?;
    info!(resolver = resolver.name(), "Intent resolver ready");

    let state = AppState::with_resolver(store, resolver, config.resolver.dispatcher_config());

    if config.seed.enabled {
        let report = seed_default_graph(&*state.graph).await?;
        if report.is_noop() {
            info!("Default graph already present");
        }
    }

    let router =
        create_router_with_observability(state, metrics_state, &HttpOptions::from_config(&config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(ref e) = result {
        error!("HTTP server error: {}", e);
    }
    result?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Builds the resolver named by `resolver.backend`.
fn build_resolver(settings: &ResolverSettings) -> anyhow::Result<Arc<dyn IntentResolver>> {
    match settings.backend.as_str() {
        "keyword" => Ok(Arc::new(KeywordResolver::new())),
        "llm" => {
            let api_key = settings
                .api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("resolver.api_key is required for llm backend"))?;
            let resolver = LlmIntentResolver::new(LlmResolverConfig {
                endpoint: settings.endpoint.clone(),
                model: settings.model.clone(),
                api_key,
                timeout: Duration::from_secs(settings.timeout_secs),
            })?;
            Ok(Arc::new(resolver))
        }
        other => anyhow::bail!("Unknown resolver backend: {other}"),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
