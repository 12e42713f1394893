//! The per-turn controller tying routing, explanation and session state together.

use crate::{
    Command,
    explain::Explainer,
    intent::{IntentClassifier, RouteError, RoutedAction, route},
    session::Session,
    speech::SpeechSynthesizer,
};
use std::sync::Arc;
use tracing::{error, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    /// The classifier asked for a difficulty change the tutor cannot honour.
    #[error(transparent)]
    InvalidDifficulty(#[from] RouteError),
    #[error("session has already ended")]
    SessionTerminated,
}

impl TurnError {
    /// Something safe to say to the student about the failed turn.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidDifficulty(_) => {
                "Sorry, I can only set the difficulty to easy, medium, or hard.".to_string()
            }
            Self::SessionTerminated => {
                "This session has ended. Start a new one to keep learning.".to_string()
            }
        }
    }
}

/// Decides what to do with each utterance and keeps the session up to date.
#[derive(Clone)]
pub struct Tutor {
    classifier: Arc<dyn IntentClassifier>,
    explainer: Explainer,
}

impl Tutor {
    pub fn new(classifier: Arc<dyn IntentClassifier>, explainer: Explainer) -> Self {
        Self {
            classifier,
            explainer,
        }
    }

    /// Runs one complete turn for `text`.
    ///
    /// A failed turn leaves the session exactly as it was.
    #[instrument(name = "turn", skip_all, fields(conversation_id = %session.conversation_id()))]
    pub async fn take_turn(&self, session: &mut Session, text: &str) -> Result<Command, TurnError> {
        if session.is_terminated() {
            return Err(TurnError::SessionTerminated);
        }

        let action = route(text, session.conversation_id(), self.classifier.as_ref()).await?;
        let command = match action {
            RoutedAction::ClarificationNeeded(prompt) => Command::SpeakText(prompt),
            RoutedAction::SetDifficulty(level) => {
                session.set_difficulty(level);
                info!(difficulty = %level, "Difficulty updated");
                Command::SpeakText(format!("Difficulty level set to {level}"))
            }
            RoutedAction::Quit(farewell) => {
                session.terminate();
                info!("Session ended by student");
                Command::SessionComplete(farewell)
            }
            RoutedAction::MathQuestion(question) => {
                Command::SpeakText(self.explainer.explain(&question, session).await)
            }
        };
        Ok(command)
    }
}

/// Hands a reply to the speech collaborator.
///
/// Speech is best effort: the reply counts as delivered even when playback
/// fails, so errors are logged and swallowed.
pub async fn deliver(text: &str, synthesizer: &dyn SpeechSynthesizer) {
    if text.is_empty() {
        return;
    }
    if let Err(e) = synthesizer.speak(text).await {
        error!(error = %e, "Error in text-to-speech");
    }
}
