//! Binary entry point for one worker agent: loads its profile, registers
//! with the registry, spawns keep-alive, and serves the streaming task
//! protocol until shut down. Mirrors the teacher's `loom-cli`/`telegram-bot`
//! main.rs pattern of `tracing_subscriber` init + a single async `main`.

use std::sync::Arc;

use agent::app::router;
use agent::profile::AgentProfile;
use agent::registry_client::{HttpRegistryClient, RegisterRequest, RegistryClient};
use agent::runtime::{GenericAgentRuntime, RuntimeConfig};
use gateway::{ModelProvider, OpenAiProvider};
use protocol::Skill;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let profile_path = std::env::args().nth(1).unwrap_or_else(|| "agent.toml".to_string());
    let profile = AgentProfile::from_toml_file(&profile_path)?;

    let registry: Arc<dyn RegistryClient> = Arc::new(HttpRegistryClient::new(profile.registry_url.clone()));
    let filestore = Arc::new(filestore::FileStore::open(
        std::env::var("FILESTORE_DIR").unwrap_or_else(|_| "filestore-data".to_string()),
    )?);

    let provider: Arc<dyn ModelProvider> = match &profile.app.api_service {
        Some(api) => Arc::new(OpenAiProvider::new(api.base_url.clone(), api.api_key.clone(), api.model.clone())),
        None => return Err("agent profile is missing [api_service]".into()),
    };

    let skills: Vec<Skill> = profile.skills.clone().into_iter().map(Skill::from).collect();

    let runtime = Arc::new(GenericAgentRuntime::new(RuntimeConfig {
        name: profile.name.clone(),
        category: profile.category.clone(),
        description: profile.description.clone(),
        system_prompt: profile.system_prompt.clone(),
        supported_media_types: profile.app.system.supported_media_types.clone(),
        skills,
        self_url: profile.url.clone(),
        registry: registry.clone(),
        filestore,
        provider,
        extra_tools: vec![],
    }));

    let agent_id = registry
        .register(RegisterRequest {
            name: profile.name.clone(),
            url: profile.url.clone(),
            category: profile.category.clone(),
            expose: profile.expose,
            visible_to: profile.visible_to.clone(),
        })
        .await?;
    runtime.set_agent_id(agent_id.clone());
    info!(agent_id = %agent_id, name = %profile.name, url = %profile.url, "registered with registry");

    let keep_alive_registry = registry.clone();
    let keep_alive_id = agent_id.clone();
    let interval = profile.app.system.keep_alive_interval();
    tokio::spawn(async move {
        agent::keep_alive::run(keep_alive_registry, keep_alive_id, interval).await;
    });

    let app = router(runtime);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", profile.app.system.port)).await?;
    info!(port = profile.app.system.port, "agent listening");

    let shutdown_registry = registry.clone();
    let shutdown_id = agent_id.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    if let Err(e) = shutdown_registry.unregister(&shutdown_id).await {
        error!(error = %e, "best-effort unregister on shutdown failed");
    }

    result.map_err(Into::into)
}
