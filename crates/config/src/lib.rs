//! Configuration loading, validation, and management for Gridline.
//!
//! Loads configuration from `~/.gridline/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use gridline_core::provider::InferenceConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The root configuration structure.
///
/// Maps directly to `~/.gridline/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Tool rounds allowed per query before the loop gives up
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,

    /// System prompt sent with every model call
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Welcome greeting configuration
    #[serde(default)]
    pub greeting: GreetingConfig,

    /// Model provider connection settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Tool server settings
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_temperature() -> f32 {
    0.0
}
fn default_max_tool_rounds() -> u32 {
    8
}
fn default_system_prompt() -> String {
    "You are a call center voice assistant, working for a power corporation in India to assist \
     its customers regarding queries related to power outage and billing details. \
     DO NOT answer any other questions."
        .into()
}
fn default_true() -> bool {
    true
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("system_prompt", &self.system_prompt)
            .field("greeting", &self.greeting)
            .field("provider", &self.provider)
            .field("server", &self.server)
            .finish()
    }
}

/// The hidden prompt used to greet the user, and what to say if it fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_greeting_prompt")]
    pub prompt: String,

    #[serde(default = "default_greeting_fallback")]
    pub fallback: String,
}

fn default_greeting_prompt() -> String {
    "system: User has connected. Greet user as a power corporation call centre representative in India.".into()
}
fn default_greeting_fallback() -> String {
    "Welcome! I'm your customer service representative from the power corporation. \
     How may I assist you today with your power outage or billing inquiries?"
        .into()
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prompt: default_greeting_prompt(),
            fallback: default_greeting_fallback(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL override (proxies, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_provider_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_secs: default_provider_timeout(),
        }
    }
}

/// How to launch the tool server.
///
/// Either `script_path` (interpreter picked from the extension) or an
/// explicit `command` with `args`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            script_path: None,
            command: None,
            args: vec![],
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.gridline/config.toml),
    /// then apply environment overrides:
    /// - `GRIDLINE_API_KEY`, then `ANTHROPIC_API_KEY`
    /// - `GRIDLINE_MODEL`
    /// - `MCP_SERVER_PATH`
    /// - `MAX_TOKENS`, `TEMPERATURE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from a specific file path, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("GRIDLINE_API_KEY").or_else(|| lookup("ANTHROPIC_API_KEY")) {
            self.api_key = Some(key);
        }

        if let Some(model) = lookup("GRIDLINE_MODEL") {
            self.model = model;
        }

        if let Some(path) = lookup("MCP_SERVER_PATH") {
            self.server.script_path = Some(path);
        }

        if let Some(v) = parse_env(&lookup, "MAX_TOKENS") {
            self.max_tokens = v;
        }

        if let Some(v) = parse_env(&lookup, "TEMPERATURE") {
            self.temperature = v;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".gridline")
    }

    /// Sampling settings for the model-call boundary.
    pub fn inference(&self) -> InferenceConfig {
        InferenceConfig {
            max_output_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 1.0".into(),
            ));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError("max_tokens must be > 0".into()));
        }

        if self.max_tool_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "max_tool_rounds must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_tool_rounds: default_max_tool_rounds(),
            system_prompt: default_system_prompt(),
            greeting: GreetingConfig::default(),
            provider: ProviderConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for gridline_core::Error {
    fn from(e: ConfigError) -> Self {
        gridline_core::Error::Config {
            message: e.to_string(),
        }
    }
}
