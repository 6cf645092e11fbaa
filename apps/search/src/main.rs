mod answer;
mod config;
mod credential;
mod documents;
mod embedding;
mod errors;
mod llm_client;
mod routes;
mod session;
mod state;
mod store;
#[cfg(test)]
mod testing;
mod ui;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::answer::AnswerComposer;
use crate::config::Config;
use crate::credential::Credential;
use crate::documents::PdfLoader;
use crate::llm_client::GroqClient;
use crate::routes::build_router;
use crate::session::{Session, SessionDeps};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (bails on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Search v{}", env!("CARGO_PKG_VERSION"));

    // Initialize embedding provider
    let embedder = embedding::from_config(config.embedding)?;

    let deps = SessionDeps {
        store_dir: config.store_dir.clone(),
        chunking: config.chunking,
        top_k: config.top_k,
        loader: Arc::new(PdfLoader::new()),
        embedder,
    };

    // Resolve the API key; without one the page only shows the configuration error
    let session = match Credential::resolve(&config.secrets_path) {
        Ok(credential) => {
            info!("API key loaded: {}", credential.masked());
            let llm = GroqClient::new(
                credential.clone(),
                config.llm_api_url.clone(),
                config.llm_timeout,
                config.llm_max_retries,
            )
            .context("Failed to build HTTP client")?
            .with_retry_delay(config.llm_retry_delay);
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Session::ready(deps, credential, AnswerComposer::new(Arc::new(llm)))?
        }
        Err(e) => Session::no_key(deps, e),
    };

    let state = AppState::new(session, config.expose_error_detail);

    // Build router
    let app = build_router(state, config.max_upload_bytes)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
