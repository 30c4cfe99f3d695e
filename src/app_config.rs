use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::providers::openai::OpenAIApi;
use crate::translation::client::RetryPolicy;
use crate::translation::profile::{TableProfile, builtin_profiles};

/// Environment variable holding the translation service key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable holding the GeoNames username
pub const GEONAMES_USERNAME_ENV: &str = "GEONAMES_USERNAME";

/// Application configuration
///
/// Loaded from `conf.json`, overridden by command line flags, with
/// credentials falling back to the environment.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// SQLite database path
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// City lookup config
    #[serde(default)]
    pub geonames: GeoNamesConfig,

    /// Table profiles
    #[serde(default = "builtin_profiles")]
    pub profiles: Vec<TableProfile>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation service provider configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// API key; falls back to `OPENAI_API_KEY`
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service URL
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,

    /// API surface: `responses` or `chat`
    #[serde(default)]
    pub api: OpenAIApi,

    /// Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_openai_model(),
            api_key: String::new(),
            endpoint: default_openai_endpoint(),
            api: OpenAIApi::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TranslationConfig {
    /// Provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Settings shared by every table run
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt template for translation
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Delay in milliseconds between consecutive batches
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,

    /// Total attempts per batch, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff unit for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
        }
    }
}

/// GeoNames lookup configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeoNamesConfig {
    /// Account name; falls back to `GEONAMES_USERNAME`
    #[serde(default = "String::new")]
    pub username: String,

    /// Service URL
    #[serde(default = "default_geonames_endpoint")]
    pub endpoint: String,

    /// ISO country code searched
    #[serde(default = "default_geonames_country")]
    pub country: String,

    /// Language of returned names
    #[serde(default = "default_target_language")]
    pub lang: String,

    /// Number of cities seeded
    #[serde(default = "default_geonames_max_rows")]
    pub max_rows: usize,

    /// Table receiving the seeded cities
    #[serde(default = "default_geonames_table")]
    pub target_table: String,

    /// Request timeout in seconds
    #[serde(default = "default_geonames_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeoNamesConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            endpoint: default_geonames_endpoint(),
            country: default_geonames_country(),
            lang: default_target_language(),
            max_rows: default_geonames_max_rows(),
            target_table: default_geonames_table(),
            timeout_secs: default_geonames_timeout_secs(),
        }
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
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "ja".to_string()
}

fn default_database_path() -> String {
    "assets/database/moon_calendar_translated_2.db".to_string()
}

fn default_openai_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_system_prompt() -> String {
    crate::translation::prompts::PromptTemplate::REFERENCE_TRANSLATOR.to_string()
}

fn default_rate_limit_delay_ms() -> u64 {
    200
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    2000
}

fn default_temperature() -> f32 {
    0.2
}

fn default_geonames_endpoint() -> String {
    "https://api.geonames.org".to_string()
}

fn default_geonames_country() -> String {
    "JP".to_string()
}

fn default_geonames_max_rows() -> usize {
    100
}

fn default_geonames_table() -> String {
    "CITIES_JA".to_string()
}

fn default_geonames_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load the config file, creating it with defaults when absent
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            return Ok(config);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {:?}", path))?;
        Ok(config)
    }

    /// Fill empty credentials from the environment
    pub fn apply_env(&mut self) {
        if self.translation.provider.api_key.is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                self.translation.provider.api_key = key.trim().to_string();
            }
        }
        if self.geonames.username.is_empty() {
            if let Ok(username) = std::env::var(GEONAMES_USERNAME_ENV) {
                self.geonames.username = username.trim().to_string();
            }
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self, require_api_key: bool) -> Result<()> {
        crate::language_utils::validate_language_code(&self.source_language)?;
        crate::language_utils::validate_language_code(&self.target_language)?;

        if require_api_key && self.translation.provider.api_key.is_empty() {
            return Err(anyhow!(
                "Translation API key is required (set it in the config or {})",
                API_KEY_ENV
            ));
        }

        if self.translation.common.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be at least 1"));
        }

        for profile in &self.profiles {
            profile.validate()?;
            if let Some(language) = &profile.source_language {
                crate::language_utils::validate_language_code(language)?;
            }
        }

        Ok(())
    }

    /// Find a profile by name
    pub fn profile(&self, name: &str) -> Result<&TableProfile> {
        self.profiles.iter().find(|p| p.name == name).ok_or_else(|| {
            anyhow!(
                "Unknown profile '{}'. Available: {}",
                name,
                self.profiles.iter().map(|p| p.name.as_str()).collect::<Vec<_>>().join(", ")
            )
        })
    }

    /// Retry policy for the translation client
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.translation.common.max_attempts,
            backoff_base: Duration::from_millis(self.translation.common.retry_backoff_ms),
        }
    }

    /// Delay between consecutive batches
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.translation.common.rate_limit_delay_ms)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            database_path: default_database_path(),
            translation: TranslationConfig::default(),
            geonames: GeoNamesConfig::default(),
            profiles: builtin_profiles(),
            log_level: LogLevel::default(),
        }
    }
}
