//! Route table

use axum::{
    Router,
    handler::HandlerWithoutStateExt,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::ServerSettings;
use crate::handlers::{chat_handler, clear_conversation, health_check, not_found};
use crate::state::AppState;

fn cors(settings: &ServerSettings) -> CorsLayer {
    let origins = if settings.allows_any_origin() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(settings.allowed_origins.iter().filter_map(|origin| {
            origin
                .parse::<HeaderValue>()
                .inspect_err(|_| tracing::warn!(%origin, "Ignoring invalid CORS origin"))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the application router
pub fn app(state: AppState, settings: &ServerSettings) -> Router {
    let static_files = ServeDir::new(&settings.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found.into_service());

    Router::new()
        // API
        .route("/api/chat", post(chat_handler))
        .route("/api/health", get(health_check))
        .route("/api/clear", post(clear_conversation))
        // Frontend
        .fallback_service(static_files)
        .layer(cors(settings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
