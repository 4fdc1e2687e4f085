use std::sync::Arc;

use axum::http::HeaderValue;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ld_agent::{GeminiClient, Planner};
use ld_backend::SupabaseClient;
use ld_server::config::{Config, Options};
use ld_server::{router, State};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = Options::parse();
    let config = Config::from_env()?;

    let backend = Arc::new(SupabaseClient::from_url(
        &config.supabase_url,
        config.service_key.clone(),
    )?);

    // A missing or broken model client degrades the agent endpoints to
    // 503 instead of failing startup.
    let planner = match config.gemini_api_key.as_deref() {
        Some(key) => match GeminiClient::new(key) {
            Ok(client) => Some(Planner::new(Arc::new(client))),
            Err(e) => {
                warn!(error = %e, "could not initialize the model client; agent endpoints disabled");
                None
            }
        },
        None => {
            warn!("GEMINI_API_KEY is not set; agent endpoints disabled");
            None
        }
    };

    let state = State::new(backend.clone(), backend.clone(), backend, planner);

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(options.listen).await?;
    info!("listening on {}", options.listen);
    axum::serve(listener, app).await?;
    Ok(())
}
