pub mod context;
pub mod dialogflow;
pub mod difficulty;
pub mod explain;
pub mod generator;
pub mod intent;
pub mod prompt;
pub mod session;
pub mod settings;
pub mod speech;
pub mod tutor;

/// Represents commands that the core logic issues to an external runtime.
///
/// This enum is the primary API for decoupling the tutor's decision-making
/// from the runtime's execution of side effects (like speaking text or
/// ending a session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Command the runtime to speak the given text to the user.
    SpeakText(String),
    /// Command indicating the session is complete, with a final message.
    SessionComplete(String),
}

impl Command {
    /// The text to show or speak for this command.
    pub fn text(&self) -> &str {
        match self {
            Command::SpeakText(text) | Command::SessionComplete(text) => text,
        }
    }

    pub fn ends_session(&self) -> bool {
        matches!(self, Command::SessionComplete(_))
    }

    pub fn into_text(self) -> String {
        match self {
            Command::SpeakText(text) | Command::SessionComplete(text) => text,
        }
    }
}
