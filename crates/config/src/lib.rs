//! Configuration loading, validation, and management for Scout.
//!
//! Loads configuration from `~/.scout/config.toml` with environment
//! variable overrides, then validates everything at startup so a missing
//! key fails before the first model call rather than mid-conversation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tool names understood by the built-in registry.
pub const WEB_SEARCH_TOOL: &str = "web_search";
pub const WEATHER_TOOL: &str = "weather_lookup";

/// The root configuration structure.
///
/// Maps directly to `~/.scout/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model provider API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Optional system prompt placed before the user query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Weather tool settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Web search tool settings
    #[serde(default)]
    pub search: SearchConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}

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
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt)
            .field("agent", &self.agent)
            .field("weather", &self.weather)
            .field("search", &self.search)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Upper bound on model calls per query
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Timeout for a single model request attempt
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout for a single tool invocation
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Retries after a transient model API failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry delay; doubles on every further attempt
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Tools advertised to the model
    #[serde(default = "default_tools")]
    pub tools: Vec<String>,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_request_timeout() -> u64 {
    60
}
fn default_tool_timeout() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_delay() -> u64 {
    500
}
fn default_tools() -> Vec<String> {
    vec![WEB_SEARCH_TOOL.into(), WEATHER_TOOL.into()]
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            request_timeout_secs: default_request_timeout(),
            tool_timeout_secs: default_tool_timeout(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
            tools: default_tools(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// weatherstack access key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_weather_url")]
    pub api_url: String,

    /// weatherstack unit code: "m" (°C), "f" (°F) or "s" (K)
    #[serde(default = "default_units")]
    pub units: String,
}

fn default_weather_url() -> String {
    "https://api.weatherstack.com".into()
}
fn default_units() -> String {
    "m".into()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_weather_url(),
            units: default_units(),
        }
    }
}

impl std::fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("units", &self.units)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_url")]
    pub api_url: String,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_search_url() -> String {
    "https://html.duckduckgo.com".into()
}
fn default_max_results() -> usize {
    5
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; Scout/0.1)".into()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_url: default_search_url(),
            max_results: default_max_results(),
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.scout/config.toml).
    ///
    /// Environment variables fill in or override:
    /// - `SCOUT_API_KEY`, then `OPENAI_API_KEY` (when no key is configured)
    /// - `WEATHERSTACK_API_KEY` (when no weather key is configured)
    /// - `SCOUT_MODEL`, `SCOUT_API_URL` (always override)
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_dir().join("config.toml"))?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from an explicitly chosen file, then apply process environment
    /// overrides. Unlike the default location, the file must exist.
    pub fn load_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
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

    /// Apply environment overrides using the given variable lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.api_key.is_none() {
            self.api_key = non_empty("SCOUT_API_KEY").or_else(|| non_empty("OPENAI_API_KEY"));
        }

        if self.weather.api_key.is_none() {
            self.weather.api_key = non_empty("WEATHERSTACK_API_KEY");
        }

        if let Some(model) = non_empty("SCOUT_MODEL") {
            self.model = model;
        }

        if let Some(url) = non_empty("SCOUT_API_URL") {
            self.api_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".scout")
    }

    /// Validate value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.request_timeout_secs == 0 || self.agent.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent timeouts must be greater than zero".into(),
            ));
        }

        if !matches!(self.weather.units.as_str(), "m" | "f" | "s") {
            return Err(ConfigError::ValidationError(format!(
                "weather.units must be one of m, f, s (got '{}')",
                self.weather.units
            )));
        }

        if self.search.max_results == 0 || self.search.max_results > 10 {
            return Err(ConfigError::ValidationError(
                "search.max_results must be between 1 and 10".into(),
            ));
        }

        Ok(())
    }

    /// Check that every credential needed by the enabled tools is present.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if is_blank(&self.api_key) {
            return Err(ConfigError::MissingCredential {
                name: "model provider API key",
                env_var: "OPENAI_API_KEY",
            });
        }

        if self.tool_enabled(WEATHER_TOOL) && is_blank(&self.weather.api_key) {
            return Err(ConfigError::MissingCredential {
                name: "weatherstack access key",
                env_var: "WEATHERSTACK_API_KEY",
            });
        }

        Ok(())
    }

    pub fn tool_enabled(&self, name: &str) -> bool {
        self.agent.tools.iter().any(|t| t == name)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: 0.0,
            max_tokens: None,
            system_prompt: None,
            agent: AgentConfig::default(),
            weather: WeatherConfig::default(),
            search: SearchConfig::default(),
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
    #[error("Config file not found at {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing {name}: set {env_var} or add it to the config file")]
    MissingCredential {
        name: &'static str,
        env_var: &'static str,
    },
}

impl From<ConfigError> for scout_core::Error {
    fn from(err: ConfigError) -> Self {
        scout_core::Error::config(err.to_string())
    }
}
