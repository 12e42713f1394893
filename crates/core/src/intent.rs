//! Intent routing.
//!
//! Every utterance is first offered to an external intent classifier. Only two
//! intents are acted on locally (changing difficulty and quitting); everything
//! else, including a classifier outage, is treated as a math question.

use crate::{
    difficulty::{DifficultyLevel, InvalidDifficulty},
    session::ConversationId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Spoken back when the input is empty.
pub const CLARIFICATION_PROMPT: &str = "I couldn't understand that. Could you please repeat?";
/// Spoken back when the student ends the session.
pub const FAREWELL_MESSAGE: &str =
    "Goodbye! Feel free to come back anytime you need help with math!";

pub const SET_DIFFICULTY_INTENT: &str = "set_difficulty";
pub const QUIT_INTENT: &str = "quit";
pub const DIFFICULTY_PARAMETER: &str = "difficulty";

/// The classifier's verdict for one utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedIntent {
    pub intent_name: String,
    pub parameters: HashMap<String, String>,
}

impl ClassifiedIntent {
    pub fn new(intent_name: impl Into<String>) -> Self {
        Self {
            intent_name: intent_name.into(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("intent service request failed: {0}")]
    Request(String),
    #[error("intent service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid intent service response: {0}")]
    InvalidResponse(String),
}

/// External natural-language-understanding service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        text: &str,
        conversation_id: &ConversationId,
    ) -> Result<ClassifiedIntent, ClassifierError>;
}

/// What the controller should do with an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutedAction {
    /// The input was empty; ask the student to repeat.
    ClarificationNeeded(String),
    SetDifficulty(DifficultyLevel),
    /// End the session with the given farewell.
    Quit(String),
    MathQuestion(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("set_difficulty intent is missing the 'difficulty' parameter")]
    MissingDifficulty,
    #[error(transparent)]
    InvalidDifficulty(#[from] InvalidDifficulty),
}

/// Classifies `text` and decides the next action.
///
/// Classifier failures are absorbed: the utterance falls through to the
/// explanation path instead of failing the turn.
pub async fn route(
    text: &str,
    conversation_id: &ConversationId,
    classifier: &dyn IntentClassifier,
) -> Result<RoutedAction, RouteError> {
    if text.trim().is_empty() {
        debug!("Empty input; asking for clarification");
        return Ok(RoutedAction::ClarificationNeeded(
            CLARIFICATION_PROMPT.to_string(),
        ));
    }

    let intent = match classifier.classify(text, conversation_id).await {
        Ok(intent) => intent,
        Err(e) => {
            warn!(error = %e, "Intent classification unavailable; treating input as a question");
            return Ok(RoutedAction::MathQuestion(text.to_string()));
        }
    };
    info!(intent = %intent.intent_name, "Detected intent");

    match intent.intent_name.as_str() {
        SET_DIFFICULTY_INTENT => {
            let raw = intent
                .parameters
                .get(DIFFICULTY_PARAMETER)
                .filter(|value| !value.trim().is_empty())
                .ok_or(RouteError::MissingDifficulty)?;
            Ok(RoutedAction::SetDifficulty(raw.parse()?))
        }
        QUIT_INTENT => Ok(RoutedAction::Quit(FAREWELL_MESSAGE.to_string())),
        _ => Ok(RoutedAction::MathQuestion(text.to_string())),
    }
}

/// An offline classifier that spots the two command intents by keyword.
///
/// Useful for local development and demos where no hosted intent agent is
/// configured. Anything it does not recognise comes back as a fallback intent.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

const QUIT_WORDS: [&str; 5] = ["quit", "exit", "goodbye", "bye", "stop"];
const DIFFICULTY_WORDS: [&str; 2] = ["difficulty", "level"];
/// Longest utterance still treated as a command when it names a level.
const MAX_LEVEL_COMMAND_WORDS: usize = 8;
/// Longest utterance treated as a command when it names no known level.
const MAX_BARE_COMMAND_WORDS: usize = 3;

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(
        &self,
        text: &str,
        _conversation_id: &ConversationId,
    ) -> Result<ClassifiedIntent, ClassifierError> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        if words.iter().any(|w| DIFFICULTY_WORDS.contains(w)) {
            let named = words
                .iter()
                .find(|w| w.parse::<DifficultyLevel>().is_ok())
                .copied();
            // Questions that merely mention "level" stay questions; only short
            // command-like utterances carry an unrecognised level through.
            let level = match named {
                Some(level) if words.len() <= MAX_LEVEL_COMMAND_WORDS => Some(level),
                None if words.len() <= MAX_BARE_COMMAND_WORDS => words.last().copied(),
                _ => None,
            };
            if let Some(level) = level {
                return Ok(ClassifiedIntent::new(SET_DIFFICULTY_INTENT)
                    .with_parameter(DIFFICULTY_PARAMETER, level));
            }
        }

        if words.len() <= 3 && words.iter().any(|w| QUIT_WORDS.contains(w)) {
            return Ok(ClassifiedIntent::new(QUIT_INTENT));
        }

        Ok(ClassifiedIntent::new("Default Fallback Intent"))
    }
}
