//! Command-line flags and environment configuration for the terminal tutor.

use clap::{Parser, Subcommand};
use mathtutor_core::{
    prompt::PromptStyle,
    settings::{ConfigError, TutorSettings},
};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "mathtutor", version, about = "A voice math tutor for the terminal")]
pub struct Cli {
    /// Prompt dialect: "step-by-step" or "spoken". Overrides PROMPT_STYLE.
    #[arg(long)]
    pub prompt_style: Option<PromptStyle>,

    /// Print replies without speaking them.
    #[arg(long)]
    pub mute: bool,

    /// Directory of prompt overrides. Overrides PROMPTS_PATH.
    #[arg(long)]
    pub prompts_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Speak a short test message and exit.
    CheckAudio,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub log_level: Level,
    pub mute: bool,
    pub tutor: TutorSettings,
}

impl Config {
    /// Loads configuration from the environment, then applies command-line overrides.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // Students read along in the terminal, so the detailed dialect is the default here.
        let mut tutor = TutorSettings::from_env(PromptStyle::StepByStep)?;
        if let Some(style) = cli.prompt_style {
            tutor.prompt_style = style;
        }
        if let Some(dir) = &cli.prompts_dir {
            tutor.prompts_path = Some(dir.clone());
        }

        Ok(Self {
            log_level,
            mute: cli.mute,
            tutor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("RUST_LOG");
            env::remove_var("LLM_PROVIDER");
            env::remove_var("PROMPT_STYLE");
            env::remove_var("PROMPTS_PATH");
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("GOOGLE_API_KEY");
            env::remove_var("DIALOGFLOW_PROJECT_ID");
            env::set_var("GEMINI_API_KEY", "test-gemini-key");
        }
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "mathtutor",
            "--prompt-style",
            "spoken",
            "--mute",
            "--prompts-dir",
            "/tmp/prompts",
        ])
        .unwrap();

        assert_eq!(cli.prompt_style, Some(PromptStyle::SpokenBrief));
        assert!(cli.mute);
        assert_eq!(cli.prompts_dir, Some(PathBuf::from("/tmp/prompts")));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_check_audio() {
        let cli = Cli::try_parse_from(["mathtutor", "check-audio"]).unwrap();
        assert_eq!(cli.command, Some(Command::CheckAudio));

        assert!(Cli::try_parse_from(["mathtutor", "--prompt-style", "verbose"]).is_err());
    }

    #[test]
    #[serial]
    fn test_defaults_to_step_by_step() {
        clear_env_vars();
        let cli = Cli::try_parse_from(["mathtutor"]).unwrap();

        let config = Config::load(&cli).unwrap();

        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.tutor.prompt_style, PromptStyle::StepByStep);
        assert!(!config.mute);
    }

    #[test]
    #[serial]
    fn test_flags_override_environment() {
        clear_env_vars();
        unsafe {
            env::set_var("PROMPT_STYLE", "step-by-step");
            env::set_var("PROMPTS_PATH", "/env/prompts");
        }
        let cli = Cli::try_parse_from([
            "mathtutor",
            "--prompt-style",
            "spoken",
            "--prompts-dir",
            "/cli/prompts",
        ])
        .unwrap();

        let config = Config::load(&cli).unwrap();

        assert_eq!(config.tutor.prompt_style, PromptStyle::SpokenBrief);
        assert_eq!(config.tutor.prompts_path, Some(PathBuf::from("/cli/prompts")));
    }
}
