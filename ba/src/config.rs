//! Configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::narrator::{DEFAULT_MAX_HIGHLIGHTS, Narrator};
use crate::policy::{DEFAULT_CLARIFY_BELOW, DEFAULT_LONG_RUN_AFTER, PolicyEngine};
use crate::utterance::{DEFAULT_MAX_FOCUS_CHARS, DEFAULT_MAX_OPTIONS, DEFAULT_MIN_FOCUS_CHARS, UtteranceBuilder};

/// Project-local config file name
const LOCAL_CONFIG: &str = ".backlogassist.yml";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Policy thresholds
    pub policy: PolicyConfig,

    /// Acknowledgement and clarification limits
    pub utterance: UtteranceConfig,

    /// Recap limits
    pub narrator: NarratorConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// Explicit path, then `./.backlogassist.yml`, then
    /// `~/.config/backlogassist/backlogassist.yml`, then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(LOCAL_CONFIG);
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(user_config) = Self::user_config_path() {
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, ignoring any other problem in the file
    ///
    /// Runs before logging is initialized, so failures are silent.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = [
            config_path.cloned(),
            Some(PathBuf::from(LOCAL_CONFIG)),
            Self::user_config_path(),
        ];
        candidates
            .into_iter()
            .flatten()
            .find(|p| p.exists())
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Config>(&content).ok())
            .and_then(|config| config.log_level)
    }

    /// Check thresholds before use
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.policy.clarify_below) {
            return Err(eyre::eyre!(
                "policy.clarify-below must be within [0, 1], got {}",
                self.policy.clarify_below
            ));
        }
        if self.utterance.max_focus_chars == 0 {
            return Err(eyre::eyre!("utterance.max-focus-chars must be positive"));
        }
        if self.utterance.min_focus_chars > self.utterance.max_focus_chars {
            return Err(eyre::eyre!(
                "utterance.min-focus-chars ({}) exceeds max-focus-chars ({})",
                self.utterance.min_focus_chars,
                self.utterance.max_focus_chars
            ));
        }
        if self.narrator.max_highlights == 0 {
            return Err(eyre::eyre!("narrator.max-highlights must be positive"));
        }
        Ok(())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("backlogassist").join("backlogassist.yml"))
    }
}

/// Policy thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PolicyConfig {
    /// Confidence below which the assistant asks for clarification
    pub clarify_below: f64,

    /// Step count above which the assistant summarizes
    pub long_run_after: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            clarify_below: DEFAULT_CLARIFY_BELOW,
            long_run_after: DEFAULT_LONG_RUN_AFTER,
        }
    }
}

impl PolicyConfig {
    pub fn engine(&self) -> PolicyEngine {
        PolicyEngine::new(self.clarify_below, self.long_run_after)
    }
}

/// Acknowledgement and clarification limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UtteranceConfig {
    pub max_focus_chars: usize,
    pub min_focus_chars: usize,
    pub max_options: usize,
}

impl Default for UtteranceConfig {
    fn default() -> Self {
        Self {
            max_focus_chars: DEFAULT_MAX_FOCUS_CHARS,
            min_focus_chars: DEFAULT_MIN_FOCUS_CHARS,
            max_options: DEFAULT_MAX_OPTIONS,
        }
    }
}

impl UtteranceConfig {
    pub fn builder(&self) -> UtteranceBuilder {
        UtteranceBuilder {
            max_focus_chars: self.max_focus_chars,
            min_focus_chars: self.min_focus_chars,
            max_options: self.max_options,
        }
    }
}

/// Recap limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NarratorConfig {
    pub max_highlights: usize,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            max_highlights: DEFAULT_MAX_HIGHLIGHTS,
        }
    }
}

impl NarratorConfig {
    pub fn narrator(&self) -> Narrator {
        Narrator::new(self.max_highlights)
    }
}
