//! Turns a math question into a spoken-safe explanation.

use crate::{
    context::QaPair,
    generator::{ExplanationGenerator, GenerationError},
    prompt::PromptTemplate,
    session::Session,
};
use std::sync::Arc;
use tracing::{error, info};

pub const RESOURCE_EXHAUSTED_APOLOGY: &str =
    "I'm currently handling too many requests. Please try again in a moment.";
pub const GENERIC_APOLOGY: &str =
    "I'm having trouble processing your request. Could you try again?";

/// Builds prompts from session state and calls the generator.
#[derive(Clone)]
pub struct Explainer {
    generator: Arc<dyn ExplanationGenerator>,
    template: PromptTemplate,
}

impl Explainer {
    pub fn new(generator: Arc<dyn ExplanationGenerator>, template: PromptTemplate) -> Self {
        Self {
            generator,
            template,
        }
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Answers `question`, remembering the exchange only when generation succeeds.
    ///
    /// Failures never leak provider error text; the caller always gets a
    /// fixed apology it can speak to the student.
    pub async fn explain(&self, question: &str, session: &mut Session) -> String {
        let prompt = self
            .template
            .render(session.difficulty(), session.context(), question);

        match self.generator.generate(&prompt).await {
            Ok(response) => {
                info!(
                    difficulty = %session.difficulty(),
                    style = %self.template.style(),
                    "Explanation generated"
                );
                session.remember(QaPair::new(question, response.clone()));
                response
            }
            Err(GenerationError::ResourceExhausted) => {
                error!("Explanation service is rate limited");
                RESOURCE_EXHAUSTED_APOLOGY.to_string()
            }
            Err(e) => {
                error!(error = %e, "Explanation service failed");
                GENERIC_APOLOGY.to_string()
            }
        }
    }
}
