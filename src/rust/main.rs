use std::path::PathBuf;

use agrovision::chat::{ChatService, GeminiClient};
use agrovision::server::{router, AppState};
use agrovision::{ArtifactSource, FallbackLoader, ModelCache, ModelManager, ServerConfig};
use anyhow::Context;
use clap::Parser;
use log::{info, warn};

/// Resolves the artifact path, downloading and verifying it when configured.
async fn prepare_artifact(config: &ServerConfig) -> anyhow::Result<PathBuf> {
    if let Some(url) = &config.model_url {
        let manager = ModelManager::new_default()?;
        let mut source = ArtifactSource::from_url(url)?;
        if let Some(hash) = &config.model_sha256 {
            source = source.with_sha256(hash.as_str());
        }
        let path = manager
            .ensure_artifact(&source)
            .await
            .with_context(|| format!("fetching model from {}", url))?;
        return Ok(path);
    }

    let path = config.model.clone();
    if !path.exists() {
        warn!("Model artifact {:?} not found; predictions will fail until it is in place", path);
        return Ok(path);
    }
    if let Some(hash) = &config.model_sha256 {
        ModelManager::new_default()?
            .require_hash(&path, hash)
            .await
            .with_context(|| format!("verifying {:?}", path))?;
        info!("Model artifact verified");
    }
    Ok(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    agrovision::init_logger();
    let config = ServerConfig::parse();

    info!("=== Starting AgroVision server ===");

    let model_path = prepare_artifact(&config).await?;
    let models = ModelCache::new(model_path, FallbackLoader::with_runtime_config(config.runtime_config()));

    let chat = ChatService::new(
        config
            .gemini_api_key
            .as_ref()
            .map(|key| GeminiClient::new(key.as_str(), config.gemini_model.as_str())),
    );
    if !chat.is_configured() {
        warn!("GEMINI_API_KEY not set; chat will answer with a fallback reply");
    }

    let app = router(AppState::new(models, chat, config.max_upload_mb));

    let addr = config.bind_address().context("invalid host/port")?;
    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
