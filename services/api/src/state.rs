//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the tutor, the
//! live sessions and the optional voice client.

use crate::sessions::SessionStore;
use mathtutor_core::{speech::ElevenLabsClient, tutor::Tutor};

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub tutor: Tutor,
    pub sessions: SessionStore,
    /// `None` when no ElevenLabs key is configured.
    pub voice: Option<ElevenLabsClient>,
}
