//! # Engine Configuration
//!
//! Optional YAML file, kebab-case keys, every key optional:
//!
//! ```yaml
//! data-dir: ~/.local/share/sightread
//! levels-file: Levels.json
//! history-file: Stack.json
//! catalog: midi_notes.json
//! sequence-max-wrong-percent: 20
//! min-notes: 2
//! min-questions: 10
//! min-timer: 10
//! ```
//!
//! The file is read into [`RawConfig`] and checked while converting to
//! [`EngineConfig`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::EngineError;

/// Limits applied when a level is created or edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min_notes: usize,
    pub min_questions: u32,
    pub min_timer: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_notes: 2,
            min_questions: 10,
            min_timer: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub levels_file: String,
    pub history_file: String,
    pub catalog: String,
    /// Sequence mode ends early when more than this share of a sequence is wrong
    pub sequence_max_wrong_percent: u8,
    pub limits: Limits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            levels_file: "Levels.json".to_string(),
            history_file: "Stack.json".to_string(),
            catalog: sightread_catalog::DEFAULT_CATALOG.to_string(),
            sequence_max_wrong_percent: 20,
            limits: Limits::default(),
        }
    }
}

/// Raw configuration for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawConfig {
    pub data_dir: Option<PathBuf>,
    pub levels_file: Option<String>,
    pub history_file: Option<String>,
    pub catalog: Option<String>,
    pub sequence_max_wrong_percent: Option<u8>,
    pub min_notes: Option<usize>,
    pub min_questions: Option<u32>,
    pub min_timer: Option<u32>,
}

impl TryFrom<RawConfig> for EngineConfig {
    type Error = EngineError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let defaults = EngineConfig::default();

        let sequence_max_wrong_percent = raw
            .sequence_max_wrong_percent
            .unwrap_or(defaults.sequence_max_wrong_percent);
        if sequence_max_wrong_percent > 100 {
            return Err(EngineError::Config(format!(
                "sequence-max-wrong-percent must be 0..=100, got {}",
                sequence_max_wrong_percent
            )));
        }

        let min_notes = raw.min_notes.unwrap_or(defaults.limits.min_notes);
        if min_notes < 1 {
            return Err(EngineError::Config("min-notes must be at least 1".to_string()));
        }

        for (key, value) in [("levels-file", &raw.levels_file), ("history-file", &raw.history_file)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(EngineError::Config(format!("{} must not be empty", key)));
            }
        }

        Ok(Self {
            data_dir: raw.data_dir.unwrap_or(defaults.data_dir),
            levels_file: raw.levels_file.unwrap_or(defaults.levels_file),
            history_file: raw.history_file.unwrap_or(defaults.history_file),
            catalog: raw.catalog.unwrap_or(defaults.catalog),
            sequence_max_wrong_percent,
            limits: Limits {
                min_notes,
                min_questions: raw.min_questions.unwrap_or(defaults.limits.min_questions),
                min_timer: raw.min_timer.unwrap_or(defaults.limits.min_timer),
            },
        })
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, EngineError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawConfig = serde_yaml::from_str(yaml)?;
        raw.try_into()
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let yaml = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Default configuration storing its files under `data_dir`
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn levels_path(&self) -> PathBuf {
        self.data_dir.join(&self.levels_file)
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(&self.history_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(EngineConfig::from_yaml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_yaml_overrides() {
        let config = EngineConfig::from_yaml_str(
            "data-dir: /tmp/sightread\nlevels-file: levels.json\nsequence-max-wrong-percent: 40\nmin-timer: 30\n",
        )
        .unwrap();
        assert_eq!(config.levels_path(), PathBuf::from("/tmp/sightread/levels.json"));
        assert_eq!(config.history_path(), PathBuf::from("/tmp/sightread/Stack.json"));
        assert_eq!(config.sequence_max_wrong_percent, 40);
        assert_eq!(config.limits.min_timer, 30);
        assert_eq!(config.limits.min_questions, 10);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_yaml_str("sequence-max-wrong-percent: 120"),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(EngineConfig::from_yaml_str("min-notes: 0"), Err(EngineError::Config(_))));
        assert!(matches!(EngineConfig::from_yaml_str("levels-file: ' '"), Err(EngineError::Config(_))));
        assert!(matches!(EngineConfig::from_yaml_str("colour: blue"), Err(EngineError::Yaml(_))));
    }
}
