//! Binary entry point for the registry: reads a single config TOML path,
//! clears the file store, starts the background eviction loop, and serves
//! the REST+SSE API until shut down. Mirrors `agentd`'s and the teacher's
//! `loom-cli`/`telegram-bot` main.rs pattern.

use std::sync::Arc;

use config::AppConfig;
use gateway::{ModelProvider, OpenAiProvider};
use registry::app::{router, AppState};
use registry::{eviction, Graph};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "registry.toml".to_string());
    let config = AppConfig::from_toml_file(&config_path)?;

    let filestore = Arc::new(filestore::FileStore::open(
        std::env::var("FILESTORE_DIR").unwrap_or_else(|_| "filestore-data".to_string()),
    )?);
    filestore.clear_all()?;

    let provider: Arc<dyn ModelProvider> = match &config.api_service {
        Some(api) => Arc::new(OpenAiProvider::new(api.base_url.clone(), api.api_key.clone(), api.model.clone())),
        None => return Err("registry config is missing [api_service]".into()),
    };

    let graph = Arc::new(Graph::new());

    let eviction_graph = graph.clone();
    let interval = config.system.keep_alive_interval();
    let threshold = config.system.keep_alive_threshold();
    tokio::spawn(async move {
        eviction::run(eviction_graph, interval, threshold).await;
    });

    let port = config.system.port;
    let state = Arc::new(AppState { graph, filestore, provider, config });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "registry listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(Into::into)
}
