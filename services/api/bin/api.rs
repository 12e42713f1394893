//! Main Entrypoint for the Math Tutor API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Building the tutor and its external collaborators.
//! 3. Constructing the Axum router and applying middleware.
//! 4. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use mathtutor_api::{
    config::Config, router::create_router, sessions::SessionStore, state::AppState,
};
use mathtutor_core::session::LocalSessionRegistry;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Services ---
    let tutor = config
        .tutor
        .build_tutor()
        .context("Failed to build the tutor")?;
    let voice = config.tutor.voice_client();
    if voice.is_none() {
        info!("ELEVEN_LABS_API_KEY not set; /speech will report 503.");
    }

    let app_state = Arc::new(AppState {
        tutor,
        sessions: SessionStore::with_limits(
            Arc::new(LocalSessionRegistry),
            config.session_idle_timeout,
            config.max_sessions,
        ),
        voice,
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        provider = ?config.tutor.provider,
        model = %config.tutor.chat_model,
        prompt_style = %config.tutor.prompt_style,
        bind_address = %config.bind_address,
        max_sessions = config.max_sessions,
        session_idle_secs = config.session_idle_timeout.as_secs(),
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
