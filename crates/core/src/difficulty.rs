use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How deep the tutor's explanations should go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Raised when a difficulty value is not one of `easy`, `medium` or `hard`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported difficulty level '{0}'; expected easy, medium or hard")]
pub struct InvalidDifficulty(pub String);

impl DifficultyLevel {
    pub const ALL: [DifficultyLevel; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyLevel {
    type Err = InvalidDifficulty;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| InvalidDifficulty(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_medium() {
        assert_eq!(DifficultyLevel::default(), DifficultyLevel::Medium);
    }

    #[test]
    fn test_parse_accepts_known_levels() {
        assert_eq!("easy".parse(), Ok(DifficultyLevel::Easy));
        assert_eq!(" Hard ".parse(), Ok(DifficultyLevel::Hard));
        assert_eq!("MEDIUM".parse(), Ok(DifficultyLevel::Medium));
    }

    #[test]
    fn test_parse_rejects_unknown_levels() {
        let err = "extreme".parse::<DifficultyLevel>().unwrap_err();
        assert_eq!(err, InvalidDifficulty("extreme".to_string()));
        assert!(err.to_string().contains("extreme"));

        assert!("".parse::<DifficultyLevel>().is_err());
        assert!("hardest".parse::<DifficultyLevel>().is_err());
    }

    #[test]
    fn test_display_and_serde_are_lowercase() {
        assert_eq!(DifficultyLevel::Hard.to_string(), "hard");
        assert_eq!(
            serde_json::to_string(&DifficultyLevel::Easy).unwrap(),
            "\"easy\""
        );
        let level: DifficultyLevel = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(level, DifficultyLevel::Medium);
    }
}
