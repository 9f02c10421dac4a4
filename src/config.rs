use crate::ai::claude::DEFAULT_MODEL;
use crate::ai::compress::{CompressionConfig, DEFAULT_CONCURRENCY, DIFF_CHARS_PER_TOKEN, MODEL_MAX_TOKENS};
use crate::ai::{CompletionOptions, NARRATIVE_TEMPERATURE};
use crate::error::{DeltascapeError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const API_KEY_ENV: &str = "ANTHROPIC_AUTH_TOKEN";
const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Claude API key (ANTHROPIC_AUTH_TOKEN takes precedence)
    pub claude_api_key: Option<String>,

    /// GitHub token for API access (GITHUB_TOKEN takes precedence)
    pub github_token: Option<String>,

    /// GitHub API root, for GitHub Enterprise
    pub github_api_url: Option<String>,

    /// Claude Messages endpoint, for proxies and gateways
    pub claude_api_url: Option<String>,

    /// Claude model used for every call
    #[serde(default = "default_model")]
    pub model: String,

    /// Where the report database lives (default: ~/.local/share/deltascape)
    pub data_dir: Option<PathBuf>,

    /// Enable caching of chunk compressions
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Cache TTL in hours (default: 168 hours / 7 days)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_hours: u32,

    /// Model input budget in tokens; sizes diff chunks
    #[serde(default = "default_model_max_tokens")]
    pub model_max_tokens: usize,

    /// Approximate diff characters per token
    #[serde(default = "default_diff_chars_per_token")]
    pub diff_chars_per_token: usize,

    /// Chunk compressions in flight at once
    #[serde(default = "default_concurrency")]
    pub summarize_concurrency: usize,

    /// Temperature of PR summaries and weekly narratives
    #[serde(default = "default_narrative_temperature")]
    pub narrative_temperature: f32,
}

impl Config {
    /// Load configuration from the default location (~/.config/deltascape/config.toml)
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DeltascapeError::config(format!(
                "Config file not found at: {}",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DeltascapeError::config("Could not determine home directory"))?;
        Ok(home.join(".config").join("deltascape").join("config.toml"))
    }

    /// Get the default data directory path
    pub fn default_data_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DeltascapeError::config("Could not determine home directory"))?;
        Ok(home.join(".local").join("share").join("deltascape"))
    }

    /// Directory holding the report database
    pub fn data_dir(&self) -> Result<PathBuf> {
        match self.data_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => Self::default_data_dir(),
        }
    }

    /// Write a default configuration file to `path`
    pub fn create_default_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config = Self::default();
        let toml_string = toml::to_string_pretty(&config)?;
        fs::write(path, toml_string)?;

        Ok(config)
    }

    /// Create a default configuration file at the default location
    pub fn create_default() -> Result<Self> {
        Self::create_default_at(&Self::default_config_path()?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(ref key) = self.claude_api_key {
            if !key.is_empty() && !key.starts_with("sk-ant-") {
                return Err(DeltascapeError::config(
                    "Invalid Claude API key format (should start with 'sk-ant-')",
                ));
            }
        }

        if self.model.trim().is_empty() {
            return Err(DeltascapeError::config("model must not be empty"));
        }

        if self.cache_ttl_hours == 0 {
            return Err(DeltascapeError::config("cache_ttl_hours must be > 0"));
        }

        if self.model_max_tokens == 0 || self.diff_chars_per_token == 0 {
            return Err(DeltascapeError::config(
                "model_max_tokens and diff_chars_per_token must be > 0",
            ));
        }

        if self.summarize_concurrency == 0 {
            return Err(DeltascapeError::config("summarize_concurrency must be > 0"));
        }

        if !(0.0..=1.0).contains(&self.narrative_temperature) {
            return Err(DeltascapeError::config(
                "narrative_temperature must be between 0.0 and 1.0",
            ));
        }

        Ok(())
    }

    /// Load config from file, or create default if it doesn't exist
    pub fn load_or_create_default() -> Result<Self> {
        match Self::load() {
            Ok(config) => Ok(config),
            Err(DeltascapeError::Config(msg)) if msg.starts_with("Config file not found") => {
                eprintln!("Config file not found. Creating default config...");
                Self::create_default()
            }
            Err(e) => Err(e),
        }
    }

    /// Claude API key from the environment, falling back to the config file
    pub fn api_key(&self) -> Result<String> {
        resolve(env::var(API_KEY_ENV).ok(), self.claude_api_key.as_deref()).ok_or_else(|| {
            DeltascapeError::MissingConfig(format!(
                "claude_api_key (or the {} environment variable)",
                API_KEY_ENV
            ))
        })
    }

    /// GitHub token from the environment, falling back to the config file
    pub fn github_token(&self) -> Option<String> {
        resolve(env::var(GITHUB_TOKEN_ENV).ok(), self.github_token.as_deref())
    }

    /// Diff compression settings derived from the token budget
    pub fn compression(&self) -> CompressionConfig {
        CompressionConfig::from_token_budget(
            self.model_max_tokens,
            self.diff_chars_per_token,
            self.summarize_concurrency,
        )
    }

    /// Options for narrative calls
    pub fn narrative(&self) -> CompletionOptions {
        CompletionOptions::with_temperature(self.narrative_temperature)
    }
}

/// First non-blank value, environment before file
fn resolve(env_value: Option<String>, file_value: Option<&str>) -> Option<String> {
    env_value
        .filter(|value| !value.trim().is_empty())
        .or_else(|| {
            file_value
                .filter(|value| !value.trim().is_empty())
                .map(String::from)
        })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            claude_api_key: None,
            github_token: None,
            github_api_url: None,
            claude_api_url: None,
            model: default_model(),
            data_dir: None,
            cache_enabled: default_true(),
            cache_ttl_hours: default_cache_ttl(),
            model_max_tokens: default_model_max_tokens(),
            diff_chars_per_token: default_diff_chars_per_token(),
            summarize_concurrency: default_concurrency(),
            narrative_temperature: default_narrative_temperature(),
        }
    }
}

// Serde default functions
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_cache_ttl() -> u32 {
    168 // 7 days in hours
}

fn default_model_max_tokens() -> usize {
    MODEL_MAX_TOKENS
}

fn default_diff_chars_per_token() -> usize {
    DIFF_CHARS_PER_TOKEN
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_narrative_temperature() -> f32 {
    NARRATIVE_TEMPERATURE
}

fn default_true() -> bool {
    true
}
