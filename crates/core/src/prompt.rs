//! Prompt dialects for the explanation service.
//!
//! The voice front end wants short answers that read well aloud, while the
//! text front end asks for worked, step-by-step explanations. Both are plain
//! templates with `{difficulty}`, `{context}` and `{question}` placeholders.

use crate::{context::ContextWindow, difficulty::DifficultyLevel};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, fs, path::Path, str::FromStr};

const SPOKEN_BRIEF_TEMPLATE: &str = include_str!("../prompts/spoken_brief.md");
const STEP_BY_STEP_TEMPLATE: &str = include_str!("../prompts/step_by_step.md");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptStyle {
    /// Brief answers phrased for text-to-speech.
    #[default]
    SpokenBrief,
    /// Detailed worked explanations.
    StepByStep,
}

impl PromptStyle {
    /// File stem used when loading an override from a prompts directory.
    pub fn template_key(&self) -> &'static str {
        match self {
            Self::SpokenBrief => "spoken_brief",
            Self::StepByStep => "step_by_step",
        }
    }

    fn builtin_template(&self) -> &'static str {
        match self {
            Self::SpokenBrief => SPOKEN_BRIEF_TEMPLATE,
            Self::StepByStep => STEP_BY_STEP_TEMPLATE,
        }
    }
}

impl fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpokenBrief => f.write_str("spoken"),
            Self::StepByStep => f.write_str("step-by-step"),
        }
    }
}

impl FromStr for PromptStyle {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "spoken" | "spoken-brief" | "spoken_brief" | "brief" => Ok(Self::SpokenBrief),
            "step-by-step" | "step_by_step" | "detailed" => Ok(Self::StepByStep),
            other => Err(format!(
                "'{other}' is not a prompt style (expected 'spoken' or 'step-by-step')"
            )),
        }
    }
}

/// A resolved prompt template for one dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    style: PromptStyle,
    template: String,
}

impl PromptTemplate {
    /// The template shipped with the crate for `style`.
    pub fn builtin(style: PromptStyle) -> Self {
        Self {
            style,
            template: style.builtin_template().to_string(),
        }
    }

    /// Uses a custom template; it must reference `{question}`.
    pub fn custom(style: PromptStyle, template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains("{question}") {
            bail!("Prompt template for '{style}' must contain a {{question}} placeholder");
        }
        Ok(Self { style, template })
    }

    /// Picks the override for `style` from `prompts` or falls back to the builtin.
    pub fn resolve(style: PromptStyle, prompts: &HashMap<String, String>) -> Result<Self> {
        match prompts.get(style.template_key()) {
            Some(template) => Self::custom(style, template.clone()),
            None => Ok(Self::builtin(style)),
        }
    }

    pub fn style(&self) -> PromptStyle {
        self.style
    }

    /// Fills in the placeholders for one question.
    pub fn render(
        &self,
        difficulty: DifficultyLevel,
        context: &ContextWindow,
        question: &str,
    ) -> String {
        let context = context.render();
        let fields = [
            ("{difficulty}", difficulty.as_str()),
            ("{context}", context.as_str()),
            ("{question}", question),
        ];

        // Single pass: substituted text is never scanned for placeholders again.
        let mut prompt = String::with_capacity(self.template.len() + context.len() + question.len());
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find('{') {
            prompt.push_str(&rest[..start]);
            let tail = &rest[start..];
            match fields.iter().find(|(name, _)| tail.starts_with(name)) {
                Some((name, value)) => {
                    prompt.push_str(value);
                    rest = &tail[name.len()..];
                }
                None => {
                    prompt.push('{');
                    rest = &tail[1..];
                }
            }
        }
        prompt.push_str(rest);
        prompt
    }
}

/// Loads every `*.md` file in `prompts_path`, keyed by file stem.
pub fn load_prompts(prompts_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    let entries = fs::read_dir(prompts_path)
        .with_context(|| format!("Could not read prompts directory {}", prompts_path.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}
