//! Provider settings shared by every front end.
//!
//! Front ends load `.env` themselves and then call [`TutorSettings::from_env`]
//! to pick up credentials and model choices for the external collaborators.

use crate::{
    dialogflow::{DEFAULT_LANGUAGE_CODE, DialogflowClassifier},
    explain::Explainer,
    generator::{
        ExplanationGenerator, GEMINI_OPENAI_COMPAT_BASE_URL, GeminiGenerator, OPENAI_BASE_URL,
        OpenAICompatibleGenerator,
    },
    intent::{IntentClassifier, KeywordClassifier},
    prompt::{PromptStyle, PromptTemplate, load_prompts},
    speech::ElevenLabsClient,
    tutor::Tutor,
};
use async_openai::config::OpenAIConfig;
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tracing::info;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported backends for explanation generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    /// Gemini's native API.
    Gemini,
    /// Gemini through its OpenAI-compatible endpoint.
    GeminiOpenAI,
    OpenAI,
}

impl Provider {
    fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini | Provider::GeminiOpenAI => "gemini-1.5-flash",
            Provider::OpenAI => "gpt-4o-mini",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogflowSettings {
    pub project_id: String,
    pub access_token: String,
    pub language_code: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceCredentials {
    pub api_key: String,
    pub voice_id: Option<String>,
}

/// Everything needed to build the collaborators behind a [`Tutor`].
#[derive(Clone, Debug)]
pub struct TutorSettings {
    pub provider: Provider,
    pub api_key: String,
    pub chat_model: String,
    pub prompt_style: PromptStyle,
    pub prompts_path: Option<PathBuf>,
    pub dialogflow: Option<DialogflowSettings>,
    pub voice: Option<VoiceCredentials>,
}

/// Reads a variable, treating empty values as unset.
fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl TutorSettings {
    /// Loads settings from environment variables.
    ///
    /// `default_style` applies when `PROMPT_STYLE` is unset, letting each
    /// front end choose its natural dialect.
    pub fn from_env(default_style: PromptStyle) -> Result<Self, ConfigError> {
        let provider = match var("LLM_PROVIDER")
            .unwrap_or_else(|| "gemini".to_string())
            .to_lowercase()
            .as_str()
        {
            "gemini" => Provider::Gemini,
            "gemini-openai" => Provider::GeminiOpenAI,
            "openai" => Provider::OpenAI,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LLM_PROVIDER".to_string(),
                    format!("'{other}' is not one of gemini, gemini-openai, openai"),
                ));
            }
        };

        let api_key = match provider {
            Provider::Gemini | Provider::GeminiOpenAI => var("GEMINI_API_KEY")
                .or_else(|| var("GOOGLE_API_KEY"))
                .ok_or_else(|| {
                    ConfigError::MissingVar(
                        "GEMINI_API_KEY (or GOOGLE_API_KEY) must be set for 'gemini' provider"
                            .to_string(),
                    )
                })?,
            Provider::OpenAI => var("OPENAI_API_KEY").ok_or_else(|| {
                ConfigError::MissingVar(
                    "OPENAI_API_KEY must be set for 'openai' provider".to_string(),
                )
            })?,
        };

        let chat_model = var("CHAT_MODEL").unwrap_or_else(|| provider.default_model().to_string());

        let prompt_style = match var("PROMPT_STYLE") {
            Some(raw) => raw
                .parse::<PromptStyle>()
                .map_err(|e| ConfigError::InvalidValue("PROMPT_STYLE".to_string(), e))?,
            None => default_style,
        };

        let prompts_path = var("PROMPTS_PATH").map(PathBuf::from);

        let dialogflow = match var("DIALOGFLOW_PROJECT_ID") {
            Some(project_id) => Some(DialogflowSettings {
                project_id,
                access_token: var("DIALOGFLOW_ACCESS_TOKEN").ok_or_else(|| {
                    ConfigError::MissingVar(
                        "DIALOGFLOW_ACCESS_TOKEN must be set when DIALOGFLOW_PROJECT_ID is set"
                            .to_string(),
                    )
                })?,
                language_code: var("DIALOGFLOW_LANGUAGE_CODE")
                    .unwrap_or_else(|| DEFAULT_LANGUAGE_CODE.to_string()),
            }),
            None => None,
        };

        let voice = var("ELEVEN_LABS_API_KEY").map(|api_key| VoiceCredentials {
            api_key,
            voice_id: var("ELEVEN_LABS_VOICE_ID"),
        });

        Ok(Self {
            provider,
            api_key,
            chat_model,
            prompt_style,
            prompts_path,
            dialogflow,
            voice,
        })
    }

    pub fn build_generator(&self) -> Arc<dyn ExplanationGenerator> {
        match self.provider {
            Provider::Gemini => {
                info!(model = %self.chat_model, "Using Gemini provider.");
                Arc::new(GeminiGenerator::new(
                    self.api_key.clone(),
                    self.chat_model.clone(),
                ))
            }
            Provider::GeminiOpenAI | Provider::OpenAI => {
                let base = if self.provider == Provider::OpenAI {
                    OPENAI_BASE_URL
                } else {
                    GEMINI_OPENAI_COMPAT_BASE_URL
                };
                info!(model = %self.chat_model, base, "Using OpenAI-compatible provider.");
                let config = OpenAIConfig::new()
                    .with_api_key(&self.api_key)
                    .with_api_base(base);
                Arc::new(OpenAICompatibleGenerator::new(
                    config,
                    self.chat_model.clone(),
                ))
            }
        }
    }

    pub fn build_classifier(&self) -> Arc<dyn IntentClassifier> {
        match &self.dialogflow {
            Some(settings) => {
                info!(project_id = %settings.project_id, "Using Dialogflow intent detection.");
                Arc::new(
                    DialogflowClassifier::new(
                        settings.project_id.clone(),
                        settings.access_token.clone(),
                    )
                    .with_language_code(settings.language_code.clone()),
                )
            }
            None => {
                info!("No Dialogflow project configured; using keyword intent detection.");
                Arc::new(KeywordClassifier)
            }
        }
    }

    /// Resolves the configured prompt dialect, honouring `PROMPTS_PATH` overrides.
    pub fn prompt_template(&self) -> anyhow::Result<PromptTemplate> {
        let prompts = match &self.prompts_path {
            Some(path) => load_prompts(path)?,
            None => HashMap::new(),
        };
        PromptTemplate::resolve(self.prompt_style, &prompts)
    }

    pub fn build_tutor(&self) -> anyhow::Result<Tutor> {
        let explainer = Explainer::new(self.build_generator(), self.prompt_template()?);
        Ok(Tutor::new(self.build_classifier(), explainer))
    }

    /// The ElevenLabs client, when a key is configured.
    pub fn voice_client(&self) -> Option<ElevenLabsClient> {
        self.voice
            .as_ref()
            .map(|voice| ElevenLabsClient::new(voice.api_key.clone(), voice.voice_id.clone()))
    }
}
