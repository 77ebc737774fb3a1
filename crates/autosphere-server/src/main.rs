//! AutoSphere HTTP Server
//!
//! Serves the chat frontend and a small JSON API backed by the
//! watsonx.ai agent.

mod config;
mod handlers;
mod router;
mod state;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autosphere_runtime::{WatsonxSettings, initialize};

use crate::config::ServerSettings;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment: config.env first, then .env; real variables win
    dotenvy::from_filename("config.env").ok();
    dotenvy::dotenv().ok();

    let settings = ServerSettings::from_env();

    // Initialize tracing
    let default_filter = if settings.debug { "debug" } else { "info,tower_http=debug" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::new();
    let app = router::app(state.clone(), &settings);

    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Build the agent in the background; the API answers 503 until it is ready
    let watsonx = WatsonxSettings::from_env();
    tokio::spawn(async move {
        if !watsonx.has_credentials() {
            tracing::error!("Missing IBM API credentials in config.env");
            tracing::warn!("Starting server without AI functionality");
            return;
        }

        match initialize(&watsonx).await {
            Ok(agent) => {
                state.install(agent);
                tracing::info!("✓ AutoSphere AI initialized successfully");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize AI");
                tracing::warn!("Starting server without AI functionality");
            }
        }
    });

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 Starting AutoSphere AI Server on {}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Frontend available at: http://{}", addr);
    tracing::info!("API endpoints available at: http://{}/api/", addr);
    tracing::info!("  POST /api/chat    - Send message");
    tracing::info!("  GET  /api/health  - Health check");
    tracing::info!("  POST /api/clear   - Clear conversation");

    axum::serve(listener, app).await?;

    Ok(())
}
