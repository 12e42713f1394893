//! Request and response bodies for the HTTP API.
//!
//! Every type here derives `utoipa::ToSchema` so the OpenAPI document stays
//! in step with what the handlers actually accept and return.

use mathtutor_core::difficulty::DifficultyLevel;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Recognized speech sent by the browser.
///
/// `text` is optional here so a missing field reaches the handler and can be
/// answered with the same `{error}` body as a malformed request.
#[derive(Deserialize, ToSchema, Debug, Default)]
pub struct ProcessAudioPayload {
    #[schema(example = "What is the square root of 16?")]
    pub text: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ProcessAudioResponse {
    /// The text exactly as received.
    pub user_message: String,
    pub response: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct CreateSessionResponse {
    #[schema(value_type = String, format = Uuid)]
    pub session_id: Uuid,
    #[schema(value_type = String, example = "medium")]
    pub difficulty: DifficultyLevel,
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct SpeechPayload {
    #[schema(example = "Four squared is sixteen.")]
    pub text: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}
