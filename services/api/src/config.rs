use mathtutor_core::{
    prompt::PromptStyle,
    settings::{ConfigError, TutorSettings},
};
use std::{net::SocketAddr, time::Duration};
use tracing::Level;

use crate::sessions::{DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS};

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub session_idle_timeout: Duration,
    pub max_sessions: usize,
    pub tutor: TutorSettings,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let session_idle_timeout = match std::env::var("SESSION_IDLE_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                ConfigError::InvalidValue(
                    "SESSION_IDLE_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a number of seconds", raw),
                )
            })?,
            Err(_) => DEFAULT_IDLE_TIMEOUT,
        };

        let max_sessions = match std::env::var("MAX_SESSIONS") {
            Ok(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "MAX_SESSIONS".to_string(),
                        format!("'{}' is not a positive count", raw),
                    ));
                }
            },
            Err(_) => DEFAULT_MAX_SESSIONS,
        };

        // The web front end plays answers aloud, so it defaults to the brief dialect.
        let tutor = TutorSettings::from_env(PromptStyle::SpokenBrief)?;

        Ok(Self {
            bind_address,
            log_level,
            session_idle_timeout,
            max_sessions,
            tutor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathtutor_core::settings::Provider;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("RUST_LOG");
            env::remove_var("SESSION_IDLE_TIMEOUT_SECS");
            env::remove_var("MAX_SESSIONS");
            env::remove_var("LLM_PROVIDER");
            env::remove_var("GEMINI_API_KEY");
            env::remove_var("GOOGLE_API_KEY");
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("PROMPT_STYLE");
            env::remove_var("DIALOGFLOW_PROJECT_ID");
            env::remove_var("ELEVEN_LABS_API_KEY");
        }
    }

    fn set_minimal_env() {
        unsafe {
            env::set_var("GEMINI_API_KEY", "test-gemini-key");
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env_minimal() {
        clear_env_vars();
        set_minimal_env();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:5000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.session_idle_timeout, DEFAULT_IDLE_TIMEOUT);
        assert_eq!(config.max_sessions, DEFAULT_MAX_SESSIONS);
        assert_eq!(config.tutor.provider, Provider::Gemini);
        assert_eq!(config.tutor.prompt_style, PromptStyle::SpokenBrief);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("RUST_LOG", "debug");
            env::set_var("PROMPT_STYLE", "step-by-step");
            env::set_var("SESSION_IDLE_TIMEOUT_SECS", "90");
            env::set_var("MAX_SESSIONS", "25");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.tutor.prompt_style, PromptStyle::StepByStep);
        assert_eq!(config.session_idle_timeout, Duration::from_secs(90));
        assert_eq!(config.max_sessions, 25);
    }

    #[test]
    #[serial]
    fn test_config_invalid_session_limits() {
        for (var, value) in [
            ("SESSION_IDLE_TIMEOUT_SECS", "soon"),
            ("MAX_SESSIONS", "0"),
        ] {
            clear_env_vars();
            set_minimal_env();
            unsafe {
                env::set_var(var, value);
            }

            match Config::from_env().unwrap_err() {
                ConfigError::InvalidValue(name, _) => assert_eq!(name, var),
                other => panic!("Expected InvalidValue for {var}, got {other:?}"),
            }
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
            _ => panic!("Expected InvalidValue for BIND_ADDRESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }

    #[test]
    #[serial]
    fn test_config_missing_provider_key() {
        clear_env_vars();

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => assert!(msg.contains("GEMINI_API_KEY")),
            _ => panic!("Expected MissingVar for GEMINI_API_KEY"),
        }
    }
}
