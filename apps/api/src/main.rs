use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shelfmark_api::config::Config;
use shelfmark_api::enrichment::{EnrichmentGateway, LlmClassifier};
use shelfmark_api::materialize::NoteMaterializer;
use shelfmark_api::routes::build_router;
use shelfmark_api::state::AppState;
use shelfmark_api::template::TemplateCatalog;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("shelfmark_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Shelfmark API v{}", env!("CARGO_PKG_VERSION"));
    info!("Vault root: {}", config.vault_root.display());

    // Initialize the classify() collaborator and the pipeline around it
    let classifier = Arc::new(LlmClassifier::new(config.anthropic_api_key.clone()));
    let gateway = EnrichmentGateway::new(classifier, config.folders.clone());
    let catalog = TemplateCatalog::builtin()?;
    let materializer = Arc::new(NoteMaterializer::new(
        config.vault_root.clone(),
        gateway,
        catalog,
    ));
    info!("Note materializer initialized ({} known folders)", config.folders.len());

    // Build app state
    let state = AppState {
        config: config.clone(),
        materializer,
    };

    // Build router. The capture surface is a browser extension, so CORS
    // stays permissive like the original gateway.
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
