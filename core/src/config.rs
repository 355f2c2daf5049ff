use crate::errors::{ProviderError, ProviderResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "exam-planner";

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Keywords that mark a message as plausibly about exam scheduling.
///
/// Entries are lowercase and matched as substrings; `"ca "` keeps its
/// trailing space so it does not fire inside words like "vacation".
pub const DEFAULT_GUARD_KEYWORDS: &[&str] = &[
    "exam",
    "test",
    "midterm",
    "mid term",
    "endterm",
    "end term",
    "lab",
    "quiz",
    "subject",
    "semester",
    "schedule",
    "timetable",
    "date",
    "time",
    "add",
    "create",
    "update",
    "edit",
    "delete",
    "remove",
    "mark",
    "complete",
    "backlog",
    "regular",
    "course",
    "class",
    "paper",
    "assessment",
    "ca ",
    "code",
    "morning",
    "afternoon",
    "evening",
];

/// Markers in a provider error that identify a retryable overload.
pub const DEFAULT_TRANSIENT_MARKERS: &[&str] = &["503", "overloaded", "high demand"];

/// Retry settings for provider calls
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub transient_markers: Vec<String>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            transient_markers: DEFAULT_TRANSIENT_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/// Configuration for the exam planner assistant
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlannerConfig {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub log_level: Option<String>,
    pub guard_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: Some("gemini-1.5-flash".to_string()),
            system_prompt: None,
            temperature: Some(0.2),
            log_level: Some("warn".to_string()),
            guard_keywords: None,
            retry: RetrySettings::default(),
        }
    }
}

impl PlannerConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> ProviderResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                ProviderError::ConfigError(format!("Failed to read config file: {}", e))
            })?;

            let config: Self = toml::from_str(&content).map_err(|e| {
                ProviderError::ConfigError(format!("Failed to parse config file: {}", e))
            })?;

            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads the default config file, then applies `.env` and `GEMINI_API_KEY`.
    pub fn load() -> ProviderResult<Self> {
        let path = get_default_config_file(APP_NAME)?;
        let mut config = Self::load_from_file(&path)?;
        dotenvy::dotenv().ok();
        config.apply_env();
        Ok(config)
    }

    /// Overrides the API key from the environment when set.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> ProviderResult<()> {
        let content = toml::to_string(self).map_err(|e| {
            ProviderError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        // Ensure the directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            ProviderError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            model_name: other.model_name.clone().or_else(|| self.model_name.clone()),
            system_prompt: other
                .system_prompt
                .clone()
                .or_else(|| self.system_prompt.clone()),
            temperature: other.temperature.or(self.temperature),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
            guard_keywords: other
                .guard_keywords
                .clone()
                .or_else(|| self.guard_keywords.clone()),
            retry: if other.retry != RetrySettings::default() {
                other.retry.clone()
            } else {
                self.retry.clone()
            },
        }
    }

    /// Configured guard keywords, or the built-in table.
    pub fn keywords(&self) -> Vec<String> {
        match &self.guard_keywords {
            Some(keywords) => keywords.clone(),
            None => DEFAULT_GUARD_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> ProviderResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        ProviderError::ConfigError("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> ProviderResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}
