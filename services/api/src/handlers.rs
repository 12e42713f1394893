//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for tutoring turns,
//! session creation and speech synthesis.
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use mathtutor_core::{speech::OutputFormat, tutor::TurnError};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    models::{
        CreateSessionResponse, ErrorResponse, HealthResponse, ProcessAudioPayload,
        ProcessAudioResponse, SpeechPayload,
    },
    state::AppState,
};

/// Header carrying the id of the session a request belongs to.
pub const SESSION_HEADER: &str = "x-session-id";

pub enum ApiError {
    BadRequest(String),
    ServiceUnavailable(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(error) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
            }
            ApiError::ServiceUnavailable(error) => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorResponse { error })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let error = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { error }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Run one tutoring turn for recognized speech.
#[utoipa::path(
    post,
    path = "/process_audio",
    request_body = ProcessAudioPayload,
    responses(
        (status = 200, description = "The tutor's reply", body = ProcessAudioResponse,
            headers(("x-session-id" = String, description = "The session the turn ran in"))),
        (status = 400, description = "Missing text or unsupported difficulty", body = ErrorResponse,
            headers(("x-session-id" = String, description = "Present when the turn reached a session"))),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("x-session-id" = Option<String>, Header, description = "Session to continue; a new one is started when absent or unknown")
    )
)]
pub async fn process_audio(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ProcessAudioPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    info!("Processing voice input");
    let user_message = match payload {
        Ok(Json(ProcessAudioPayload { text: Some(text) })) => text,
        Ok(_) => {
            error!("No text in request");
            return Err(ApiError::BadRequest("No text received".to_string()));
        }
        Err(rejection) => {
            error!(error = %rejection, "Malformed request body");
            return Err(ApiError::BadRequest("No text received".to_string()));
        }
    };

    let requested = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok());
    let (session_id, session) = state.sessions.get_or_create(requested).await?;
    info!(%session_id, text = %user_message, "Received text");

    let turn = {
        let mut session = session.lock().await;
        state.tutor.take_turn(&mut session, &user_message).await
    };

    // Rejected turns still name their session so the client can carry on in it.
    let session_header = [(SESSION_HEADER, session_id.to_string())];
    let command = match turn {
        Ok(command) => command,
        Err(e @ TurnError::InvalidDifficulty(_)) => {
            warn!(%session_id, error = %e, "Rejected difficulty change");
            return Ok((session_header, ApiError::BadRequest(e.user_message())).into_response());
        }
        Err(e @ TurnError::SessionTerminated) => {
            state.sessions.remove(session_id).await;
            return Ok((session_header, ApiError::BadRequest(e.user_message())).into_response());
        }
    };

    if command.ends_session() {
        state.sessions.remove(session_id).await;
    }

    let response = command.into_text();
    info!(%session_id, response = %response, "Tutor response");

    Ok((
        session_header,
        Json(ProcessAudioResponse {
            user_message,
            response,
        }),
    )
        .into_response())
}

/// Start a new tutoring session.
#[utoipa::path(
    post,
    path = "/sessions",
    responses(
        (status = 201, description = "Session created successfully", body = CreateSessionResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let (session_id, session) = state.sessions.create().await?;
    let difficulty = session.lock().await.difficulty();

    Ok((
        StatusCode::CREATED,
        [(SESSION_HEADER, session_id.to_string())],
        Json(CreateSessionResponse {
            session_id,
            difficulty,
        }),
    ))
}

/// Render text as MP3 speech.
#[utoipa::path(
    post,
    path = "/speech",
    request_body = SpeechPayload,
    responses(
        (status = 200, description = "MP3 audio", content_type = "audio/mpeg", body = Vec<u8>),
        (status = 400, description = "Missing or malformed text", body = ErrorResponse),
        (status = 503, description = "No voice configured", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn synthesize_speech(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SpeechPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = match payload {
        Ok(Json(payload)) if !payload.text.trim().is_empty() => payload,
        Ok(_) => return Err(ApiError::BadRequest("No text received".to_string())),
        Err(rejection) => {
            error!(error = %rejection, "Malformed speech request body");
            return Err(ApiError::BadRequest("No text received".to_string()));
        }
    };
    let voice = state.voice.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("Speech synthesis is not configured".to_string())
    })?;

    let format = OutputFormat::Mp3;
    let audio = voice.synthesize(&payload.text, format).await?;
    Ok(([(header::CONTENT_TYPE, format.content_type())], audio))
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
