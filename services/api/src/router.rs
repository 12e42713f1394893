//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the tutoring endpoints and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        CreateSessionResponse, ErrorResponse, HealthResponse, ProcessAudioPayload,
        ProcessAudioResponse, SpeechPayload,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::process_audio,
        handlers::create_session,
        handlers::synthesize_speech,
        handlers::health,
    ),
    components(
        schemas(ProcessAudioPayload, ProcessAudioResponse, CreateSessionResponse, SpeechPayload, HealthResponse, ErrorResponse)
    ),
    tags(
        (name = "Math Tutor API", description = "Voice math tutoring turns and speech synthesis")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/process_audio", post(handlers::process_audio))
        .route("/sessions", post(handlers::create_session))
        .route("/speech", post(handlers::synthesize_speech))
        .route("/health", get(handlers::health))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
