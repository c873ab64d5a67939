// HTTP server module
//
// - Axum router with the transcription and maintenance endpoints
// - NDJSON streaming of pipeline progress
// - CORS and request tracing middleware

pub mod handlers;
pub mod routes;

use std::sync::Arc;
use tracing::{info, warn};

pub use routes::create_router;

use crate::cache::ResultCache;
use crate::config::Config;
use crate::error::Result;
use crate::media::MediaCommand;
use crate::workflow::Workflow;

/// Shared server state
pub struct AppState {
    pub config: Config,
    pub cache: Arc<ResultCache>,
    pub workflow: Arc<Workflow>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let cache = Arc::new(ResultCache::new(&config.cache));
        let workflow = Arc::new(Workflow::new(&config, cache.clone()));
        Self {
            config,
            cache,
            workflow,
        }
    }

    pub fn with_workflow(config: Config, workflow: Arc<Workflow>) -> Self {
        Self {
            cache: workflow.cache().clone(),
            config,
            workflow,
        }
    }
}

/// Bind the configured address and serve until the process exits
pub async fn serve(config: Config) -> Result<()> {
    let extractor = &config.acquire.binary_path;
    match MediaCommand::check_binary(extractor).await {
        Ok(version) => info!("Using {} {}", extractor, version),
        Err(e) => warn!("{}; downloads will fail until it is installed", e),
    }

    let addr = config.server.socket_addr();
    let state = Arc::new(AppState::new(config));
    let router = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        "Listening on http://{} (cache: {} entries, ttl {}s)",
        addr, state.config.cache.max_entries, state.config.cache.ttl_secs
    );

    axum::serve(listener, router).await?;
    Ok(())
}
