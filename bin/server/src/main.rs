use flowsmith_generator::{GenerationOrchestrator, MemoryCache};
use flowsmith_server::{AppState, ServerConfig, ServerError, router};
use flowsmith_workflow::NodeTypeRegistry;
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Report<ServerError>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().map_err(|e| ServerError::Config {
        details: e.to_string(),
    })?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        cache = config.cache.enabled,
        "Loaded configuration"
    );

    let backend =
        flowsmith_ai::connect(&config.ai.backend_config()).map_err(|e| ServerError::Backend {
            details: e.to_string(),
        })?;
    tracing::info!(
        provider = %backend.provider(),
        model = backend.model(),
        "AI backend ready"
    );

    let mut orchestrator =
        GenerationOrchestrator::new(Arc::new(NodeTypeRegistry::builtin()), backend)
            .with_config(config.orchestrator_config());
    if config.cache.enabled {
        orchestrator = orchestrator.with_cache(Arc::new(MemoryCache::new()));
    }

    let app = router(AppState::new(orchestrator));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| ServerError::Bind {
            addr: config.bind_addr.clone(),
            details: e.to_string(),
        })?;

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Serve {
            details: e.to_string(),
        })?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
