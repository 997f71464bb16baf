use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;
use std::time::Duration;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Correction service config
    #[serde(default)]
    pub service: ServiceConfig,

    /// Correction run config
    #[serde(default)]
    pub correction: CorrectionConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Correction service provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl ServiceProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    // @returns: Whether the provider needs an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

impl std::fmt::Display for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for ServiceProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: ServiceProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(&provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(&provider_type),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Correction service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: ServiceProvider,

    /// Available providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common settings applicable to all providers
    #[serde(default)]
    pub common: ServiceCommonConfig,
}

/// Common service settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceCommonConfig {
    /// System prompt template for correction
    /// Placeholders: {language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Language of the subtitles, as a name the model understands
    #[serde(default = "default_language")]
    pub language: String,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ServiceCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            language: default_language(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// How the reference transcript is apportioned across batches
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExcerptStrategy {
    /// Slice proportionally to each batch's share of cue text
    #[default]
    Proportional,
    /// Send the whole transcript with every batch
    Whole,
}

/// Bounded exponential backoff for correction calls
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    #[serde(default = "default_retry_count")]
    pub max_retries: u32,

    /// Delay before the first retry, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Policy that never waits, for tests
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_retry_count(),
            base_delay_ms: default_retry_backoff_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Run configuration of the correction engine
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CorrectionConfig {
    /// Maximum cues per batch
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Optional bound on cue characters per batch
    #[serde(default)]
    pub max_batch_chars: Option<usize>,

    /// Preceding cues sent read-only as context
    #[serde(default = "default_context_cues")]
    pub context_cues: usize,

    /// How reference text is apportioned across batches
    #[serde(default)]
    pub excerpt_strategy: ExcerptStrategy,

    /// Fraction of a batch's reference share added on each side
    #[serde(default = "default_reference_slack")]
    pub reference_slack: f64,

    /// Widen excerpts to whole segments
    #[serde(default = "default_true")]
    pub snap_to_segments: bool,

    /// Record unchanged cues in the report
    #[serde(default)]
    pub report_unchanged: bool,

    /// Reject replies whose cue length changes by more than this ratio
    #[serde(default)]
    pub max_length_change_ratio: Option<f64>,

    /// Retry behaviour for each batch
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Pause between consecutive batches in milliseconds
    #[serde(default)]
    pub batch_delay_ms: u64,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_batch_chars: None,
            context_cues: default_context_cues(),
            excerpt_strategy: ExcerptStrategy::default(),
            reference_slack: default_reference_slack(),
            snap_to_segments: true,
            report_unchanged: false,
            max_length_change_ratio: None,
            retry: RetryPolicy::default(),
            batch_delay_ms: 0,
        }
    }
}

impl CorrectionConfig {
    /// Check values the engine cannot work with
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_batch_size == 0 {
            return Err("max_batch_size must be at least 1".to_string());
        }
        if self.max_batch_chars == Some(0) {
            return Err("max_batch_chars must be at least 1 when set".to_string());
        }
        if !self.reference_slack.is_finite() || self.reference_slack < 0.0 {
            return Err(format!("reference_slack must be a non-negative number, got {}", self.reference_slack));
        }
        if let Some(ratio) = self.max_length_change_ratio {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(format!("max_length_change_ratio must be positive, got {}", ratio));
            }
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err("retry.max_delay_ms must not be below retry.base_delay_ms".to_string());
        }
        Ok(())
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_batch_size() -> usize {
    20
}

fn default_context_cues() -> usize {
    2
}

fn default_reference_slack() -> f64 {
    0.15
}

fn default_retry_count() -> u32 {
    3 // Default to 3 retries
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "Traditional Chinese".to_string()
}

fn default_endpoint(provider: &ServiceProvider) -> String {
    match provider {
        ServiceProvider::Ollama => "http://localhost:11434".to_string(),
        ServiceProvider::OpenAI => "https://api.openai.com/v1".to_string(),
        ServiceProvider::Anthropic => "https://api.anthropic.com".to_string(),
        // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
        ServiceProvider::LMStudio => "http://localhost:1234/v1".to_string(),
    }
}

fn default_model(provider: &ServiceProvider) -> String {
    match provider {
        ServiceProvider::Ollama => "llama3.2:3b".to_string(),
        ServiceProvider::OpenAI => "gpt-4o-mini".to_string(),
        ServiceProvider::Anthropic => "claude-3-haiku-20240307".to_string(),
        // Placeholder; users should set to the loaded model name in LM Studio
        ServiceProvider::LMStudio => "local-model".to_string(),
    }
}

fn default_system_prompt() -> String {
    crate::correction::prompts::DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Config {
    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write this configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        self.correction.validate().map_err(|e| anyhow!(e))?;

        if self.service.provider.requires_api_key() && self.service.get_api_key().is_empty() {
            return Err(anyhow!(
                "API key is required for the {} provider",
                self.service.provider.display_name()
            ));
        }

        Ok(())
    }
}

impl ServiceConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.provider.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider configuration, created if absent
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        if let Some(pos) = self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            &mut self.available_providers[pos]
        } else {
            self.available_providers.push(ProviderConfig::new(self.provider.clone()));
            let last = self.available_providers.len() - 1;
            &mut self.available_providers[last]
        }
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        self.get_active_provider_config()
            .filter(|p| !p.model.is_empty())
            .map_or_else(|| default_model(&self.provider), |p| p.model.clone())
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        self.get_active_provider_config()
            .filter(|p| !p.endpoint.is_empty())
            .map_or_else(|| default_endpoint(&self.provider), |p| p.endpoint.clone())
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout(&self) -> Duration {
        let secs = self.get_active_provider_config()
            .map_or_else(default_timeout_secs, |p| p.timeout_secs);
        Duration::from_secs(secs.max(1))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            provider: ServiceProvider::default(),
            available_providers: vec![
                ProviderConfig::new(ServiceProvider::Ollama),
                ProviderConfig::new(ServiceProvider::OpenAI),
                ProviderConfig::new(ServiceProvider::Anthropic),
                ProviderConfig::new(ServiceProvider::LMStudio),
            ],
            common: ServiceCommonConfig::default(),
        }
    }
}
