//! studyplan configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::schedule::MergePolicy;

/// Main studyplan configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generative backend configuration
    pub llm: LlmConfig,

    /// Schedule generation tuning
    pub schedule: ScheduleConfig,

    /// Task store location
    pub storage: StorageConfig,

    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Resolves the provider and checks the API key variable is set, so a bad
    /// setup fails before any prompt is sent.
    pub fn validate(&self) -> Result<()> {
        let resolved = self.llm.resolve()?;
        if std::env::var(&resolved.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                resolved.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .studyplan.yml
        let local_config = PathBuf::from(".studyplan.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/studyplan/studyplan.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("studyplan").join("studyplan.yml");
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

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
///
/// Only `provider` is required to pick sensible values; `model`, `api-key-env`
/// and `base-url` fall back to the provider's defaults when left out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "gemini" or "anthropic"
    pub provider: String,

    /// Model identifier
    pub model: Option<String>,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: Option<String>,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    /// Maximum output tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            api_key_env: None,
            base_url: None,
            max_tokens: 8192,
            temperature: 0.9,
            timeout_ms: 120_000,
        }
    }
}

impl LlmConfig {
    /// Fill provider defaults into the optional fields
    pub fn resolve(&self) -> Result<ResolvedLlmConfig> {
        let (model, key_env, base_url) = match self.provider.as_str() {
            "gemini" => ("gemini-1.5-pro", "GEMINI_API_KEY", "https://generativelanguage.googleapis.com"),
            "anthropic" => ("claude-sonnet-4-20250514", "ANTHROPIC_API_KEY", "https://api.anthropic.com"),
            other => {
                return Err(eyre::eyre!(
                    "Unknown LLM provider '{}'. Supported providers: gemini, anthropic",
                    other
                ));
            }
        };

        Ok(ResolvedLlmConfig {
            provider: self.provider.clone(),
            model: self.model.clone().unwrap_or_else(|| model.to_string()),
            api_key_env: self.api_key_env.clone().unwrap_or_else(|| key_env.to_string()),
            base_url: self.base_url.clone().unwrap_or_else(|| base_url.to_string()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout_ms: self.timeout_ms,
        })
    }
}

/// LLM configuration with every provider default applied
#[derive(Debug, Clone)]
pub struct ResolvedLlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_ms: u64,
}

impl ResolvedLlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        let key = std::env::var(&self.api_key_env)
            .map_err(|_| eyre::eyre!("Environment variable {} not set", self.api_key_env))?;
        if key.trim().is_empty() {
            return Err(eyre::eyre!("Environment variable {} is empty", self.api_key_env));
        }
        Ok(key)
    }
}

/// Schedule generation tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Prompts shorter than this (after trimming) are rejected
    #[serde(rename = "min-prompt-len")]
    pub min_prompt_len: usize,

    /// Days covered by a weekly horizon, counted from today
    #[serde(rename = "weekly-span-days")]
    pub weekly_span_days: u32,

    /// Days covered by each fallback candidate
    #[serde(rename = "fallback-days")]
    pub fallback_days: u32,

    /// Number of fallback candidates
    #[serde(rename = "fallback-candidates")]
    pub fallback_candidates: usize,

    /// What to do when a committed task overlaps an existing one
    #[serde(rename = "merge-policy")]
    pub merge_policy: MergePolicy,

    /// Directory searched for `<name>.hbs` template overrides
    #[serde(rename = "prompts-dir")]
    pub prompts_dir: Option<PathBuf>,

    /// Maximum existing tasks summarized in the prompt
    #[serde(rename = "existing-context-limit")]
    pub existing_context_limit: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_prompt_len: 10,
            weekly_span_days: 10,
            fallback_days: 7,
            fallback_candidates: 3,
            merge_policy: MergePolicy::default(),
            prompts_dir: dirs::config_dir().map(|d| d.join("studyplan").join("prompts")),
            existing_context_limit: 50,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON document holding every task
    #[serde(rename = "tasks-file")]
    pub tasks_file: PathBuf,

    /// JSON document holding courses and assignments
    #[serde(rename = "academics-file")]
    pub academics_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // XDG data directory (~/.local/share/studyplan on Linux)
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("studyplan"))
            .unwrap_or_else(|| PathBuf::from(".studyplan"));

        Self {
            tasks_file: data_dir.join("tasks.json"),
            academics_file: data_dir.join("academics.json"),
        }
    }
}
