//! Concierge - conversational assistant widget engine
//!
//! Routes widget utterances to local shortcut replies or a remote chat
//! backend, and hosts one engine per browser session over HTTP + SSE.

mod api;
mod config;
mod context;
mod dispatch;
mod router;
mod runtime;
mod scheduler;
mod state_machine;
mod transcript;

use api::{create_router, AppState};
use config::Config;
use dispatch::{HttpBackend, LoggingBackend, ReplyBackend, UnavailableBackend};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "concierge=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = Config::from_env()?;

    // Remote backend
    let backend: Arc<dyn ReplyBackend> = match &config.backend_url {
        Some(url) => {
            let http = HttpBackend::new(url, config.backend_timeout)?;
            tracing::info!(
                endpoint = %http.endpoint(),
                timeout_secs = config.backend_timeout.as_secs(),
                "Chat backend configured"
            );
            Arc::new(LoggingBackend::new(Arc::new(http), "http"))
        }
        None => {
            tracing::warn!(
                "No chat backend configured. Set CONCIERGE_BACKEND_URL; remote questions will get an apology."
            );
            Arc::new(LoggingBackend::new(Arc::new(UnavailableBackend), "unavailable"))
        }
    };

    // Create application state
    let state = AppState::new(backend, config.engine_settings());

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        company = %config.company_name,
        redirect_delay_ms = %config.redirect_delay.as_millis(),
        speech_supported = config.speech_supported,
        session_idle_secs = config.session_idle_timeout.as_secs(),
        "Concierge server listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
