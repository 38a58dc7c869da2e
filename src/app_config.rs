/*!
 * Application configuration.
 *
 * Loading, validating and saving the JSON configuration file. Every field
 * has a serde default so partial files are accepted; the knobs that tune
 * batching, retries and the quality gate can also be overridden from the
 * environment.
 */

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::translation::batch::BatchLimits;
use crate::translation::pipeline::PipelineConfig;
use crate::translation::reconcile::ReconcileConfig;
use crate::validation::quality_gate::GateThresholds;

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Target language code (ISO 639-1 or 639-2)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Quality gate thresholds
    #[serde(default)]
    pub quality_gate: GateThresholds,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
    // @provider: Offline mock, for dry runs
    Mock,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
            Self::Mock => "Mock",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
            Self::Mock => "mock".to_string(),
        }
    }

    /// Whether this provider needs an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            "mock" => Ok(Self::Mock),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration entry
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
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

    // @field: Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(provider_type),
            timeout_secs: default_provider_timeout_secs(provider_type),
            rate_limit: default_rate_limit(provider_type),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Batch size limits
    #[serde(default)]
    pub batching: BatchLimits,

    /// Retry and acceptance settings for reconciliation
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// Custom system prompt for LLM providers. `{target_language}` and
    /// `{target_code}` are substituted; the built-in prompt is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_target_language() -> String {
    "he".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.3
}

fn default_provider_timeout_secs(provider: TranslationProvider) -> u64 {
    match provider {
        TranslationProvider::Anthropic => 60,
        _ => default_timeout_secs(),
    }
}

fn default_endpoint(provider: TranslationProvider) -> String {
    match provider {
        TranslationProvider::Ollama => "http://localhost:11434",
        TranslationProvider::OpenAI => "https://api.openai.com/v1",
        TranslationProvider::Anthropic => "https://api.anthropic.com",
        // LM Studio's OpenAI-compatible server
        TranslationProvider::LMStudio => "http://localhost:1234/v1",
        TranslationProvider::Mock => "",
    }
    .to_string()
}

fn default_model(provider: TranslationProvider) -> String {
    match provider {
        TranslationProvider::Ollama => "llama3.2:3b",
        TranslationProvider::OpenAI => "gpt-4o-mini",
        TranslationProvider::Anthropic => "claude-3-5-haiku-latest",
        // Placeholder; set to the model loaded in LM Studio
        TranslationProvider::LMStudio => "local-model",
        TranslationProvider::Mock => "mock",
    }
    .to_string()
}

fn default_rate_limit(provider: TranslationProvider) -> Option<u32> {
    match provider {
        TranslationProvider::OpenAI => Some(60),
        // Slightly below the 50 requests per minute API limit
        TranslationProvider::Anthropic => Some(45),
        _ => None,
    }
}

/// Environment variables that override file settings
pub const ENV_MAX_SEGMENTS_PER_BATCH: &str = "MAX_SEGMENTS_PER_BATCH";
pub const ENV_MAX_TOKENS_PER_BATCH: &str = "MAX_TOKENS_PER_BATCH";
pub const ENV_MAX_RETRIES: &str = "MAX_RETRIES";
pub const ENV_MAX_CPS: &str = "MAX_CPS";
pub const ENV_MAX_CUE_DURATION: &str = "MAX_CUE_DURATION";
pub const ENV_MIN_GAP_MS: &str = "MIN_GAP_MS";

/// Parse `raw` into `target`, leaving it untouched when parsing fails
fn override_from<T: std::str::FromStr>(name: &str, raw: Option<String>, target: &mut T) {
    let Some(raw) = raw else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => {
            debug!("Config override from {}={}", name, raw);
            *target = value;
        }
        Err(_) => warn!("Ignoring {}={:?}: not a valid value", name, raw),
    }
}

impl Config {
    /// Load a configuration file, creating it with defaults when absent
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            warn!("Config file not found at '{}', creating default config.", path.display());
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let batching = &mut self.translation.batching;
        override_from(
            ENV_MAX_SEGMENTS_PER_BATCH,
            lookup(ENV_MAX_SEGMENTS_PER_BATCH),
            &mut batching.max_segments_per_batch,
        );
        override_from(
            ENV_MAX_TOKENS_PER_BATCH,
            lookup(ENV_MAX_TOKENS_PER_BATCH),
            &mut batching.max_tokens_per_batch,
        );
        override_from(
            ENV_MAX_RETRIES,
            lookup(ENV_MAX_RETRIES),
            &mut self.translation.reconcile.max_retries,
        );

        let gate = &mut self.quality_gate;
        override_from(ENV_MAX_CPS, lookup(ENV_MAX_CPS), &mut gate.max_cps);
        override_from(ENV_MAX_CUE_DURATION, lookup(ENV_MAX_CUE_DURATION), &mut gate.max_cue_duration);
        override_from(ENV_MIN_GAP_MS, lookup(ENV_MIN_GAP_MS), &mut gate.min_gap_ms);
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.target_language)
            .with_context(|| format!("Invalid target language: {}", self.target_language))?;

        let batching = &self.translation.batching;
        if batching.max_segments_per_batch == 0 {
            return Err(anyhow!("max_segments_per_batch must be at least 1"));
        }
        if batching.max_tokens_per_batch == 0 {
            return Err(anyhow!("max_tokens_per_batch must be at least 1"));
        }

        validate_thresholds(&self.quality_gate)?;

        if self.translation.provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} provider",
                self.translation.provider.display_name()
            ));
        }

        Ok(())
    }

    /// Settings for a translation job
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            batching: self.translation.batching,
            reconcile: self.translation.reconcile.clone(),
            quality_gate: self.quality_gate,
        }
    }
}

/// Reject gate thresholds that are zero, negative or NaN
pub fn validate_thresholds(gate: &GateThresholds) -> Result<()> {
    for (name, value) in [
        ("max_cps", gate.max_cps),
        ("max_cue_duration", gate.max_cue_duration),
        ("min_gap_ms", gate.min_gap_ms),
    ] {
        if value.is_nan() || value <= 0.0 {
            return Err(anyhow!("quality_gate.{} must be a positive number, got {}", name, value));
        }
    }
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            quality_gate: GateThresholds::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get a mutable provider configuration, adding a default entry when absent
    pub fn provider_config_mut(&mut self, provider_type: TranslationProvider) -> &mut ProviderConfig {
        let provider_str = provider_type.to_lowercase_string();
        let index = match self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_str)
        {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(provider_type));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        self.get_active_provider_config()
            .filter(|p| !p.model.is_empty())
            .map(|p| p.model.clone())
            .unwrap_or_else(|| default_model(self.provider))
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
            .map(|p| p.endpoint.clone())
            .unwrap_or_else(|| default_endpoint(self.provider))
    }

    /// Get the per-request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .filter(|p| p.timeout_secs > 0)
            .map(|p| p.timeout_secs)
            .unwrap_or_else(|| default_provider_timeout_secs(self.provider))
    }

    /// Get the rate limit for the active provider
    pub fn get_rate_limit(&self) -> Option<u32> {
        match self.get_active_provider_config() {
            Some(provider_config) => provider_config.rate_limit,
            None => default_rate_limit(self.provider),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: [
                TranslationProvider::Ollama,
                TranslationProvider::OpenAI,
                TranslationProvider::Anthropic,
                TranslationProvider::LMStudio,
            ]
            .into_iter()
            .map(ProviderConfig::new)
            .collect(),
            temperature: default_temperature(),
            batching: BatchLimits::default(),
            reconcile: ReconcileConfig::default(),
            system_prompt: None,
        }
    }
}
