use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::default::Default;
use std::path::Path;

use crate::errors::ConfigError;
use crate::language_utils::{self, LocaleTag};
use crate::translation::{FailurePolicy, PlaceholderMask};
use crate::translation::mask::DEFAULT_PROTECTED_PATTERNS;

/// Application configuration module
/// This module handles the application configuration: JSON loading, environment
/// overrides and validation. The assembled `Config` is handed to the core as is.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code, or `auto`
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language codes
    #[serde(default)]
    pub target_languages: Vec<String>,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Placeholder protection settings
    #[serde(default)]
    pub protection: ProtectionConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation backend kind
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    // @provider: Azure Translator (keyed)
    Azure,
    // @provider: Google web endpoint (keyless)
    Google,
    // @provider: LibreTranslate instance
    LibreTranslate,
}

impl ProviderKind {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Azure => "Azure Translator",
            Self::Google => "Google Translate",
            Self::LibreTranslate => "LibreTranslate",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Azure => "azure".to_string(),
            Self::Google => "google".to_string(),
            Self::LibreTranslate => "libretranslate".to_string(),
        }
    }

    fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Azure => "https://api.cognitive.microsofttranslator.com",
            Self::Google => "https://translate.googleapis.com",
            Self::LibreTranslate => "https://libretranslate.com",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "azure" => Ok(Self::Azure),
            "google" => Ok(Self::Google),
            "libretranslate" | "libre" => Ok(Self::LibreTranslate),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Format of the text sent to a provider
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextType {
    #[default]
    Plain,
    Html,
}

impl TextType {
    /// Azure `textType` value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Html => "html",
        }
    }

    /// LibreTranslate `format` value
    pub fn as_libre_format(&self) -> &'static str {
        match self {
            Self::Plain => "text",
            Self::Html => "html",
        }
    }
}

impl std::str::FromStr for TextType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "plain" | "text" => Ok(Self::Plain),
            "html" => Ok(Self::Html),
            _ => Err(anyhow!("Invalid text type: {}", s)),
        }
    }
}

/// One link of the provider chain
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: ProviderKind,

    // @field: Service URL, empty for the provider default
    #[serde(default)]
    pub endpoint: String,

    // @field: API key
    #[serde(default)]
    pub api_key: String,

    // @field: Azure resource region
    #[serde(default)]
    pub region: String,

    // @field: Azure API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    // @field: Azure custom translator category
    #[serde(default)]
    pub category: String,

    // @field: Plain text or HTML
    #[serde(default)]
    pub text_type: TextType,

    // @field: Max in-flight requests, `None` for the provider profile
    #[serde(default)]
    pub concurrent_requests: Option<usize>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: ProviderKind) -> Self {
        Self {
            provider_type,
            endpoint: String::new(),
            api_key: String::new(),
            region: String::new(),
            api_version: default_api_version(),
            category: String::new(),
            text_type: TextType::default(),
            concurrent_requests: None,
        }
    }

    /// Configured endpoint, or the provider's public one
    pub fn effective_endpoint(&self) -> String {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            self.provider_type.default_endpoint().to_string()
        } else {
            endpoint.to_string()
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TranslationConfig {
    /// Ordered provider chain; empty selects the default chain
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

impl TranslationConfig {
    /// Providers to try, in order
    ///
    /// Without explicit providers this is the keyless Google endpoint followed
    /// by LibreTranslate. An Azure key from the environment adds an explicit link.
    pub fn chain(&self) -> Vec<ProviderConfig> {
        if !self.providers.is_empty() {
            return self.providers.clone();
        }
        vec![
            ProviderConfig::new(ProviderKind::Google),
            ProviderConfig::new(ProviderKind::LibreTranslate),
        ]
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: ProviderKind) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.provider_type == provider_type)
    }

    /// The Azure link, inserted at the head of the chain if absent
    pub fn azure_mut(&mut self) -> &mut ProviderConfig {
        let index = match self.providers.iter().position(|p| p.provider_type == ProviderKind::Azure) {
            Some(index) => index,
            None => {
                self.providers.insert(0, ProviderConfig::new(ProviderKind::Azure));
                0
            }
        };
        &mut self.providers[index]
    }
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Idle connections kept per host
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: usize,

    /// Attempts per provider before falling back to the next one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Worker pool size
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Ask the provider for a transliteration instead of a translation
    #[serde(default)]
    pub transliterate: bool,

    /// Target script when transliterating
    #[serde(default = "default_to_script")]
    pub to_script: String,

    /// What to do with units that could not be translated
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Reuse identical translations within a run
    #[serde(default = "default_true")]
    pub cache: bool,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            pool_max_size: default_pool_max_size(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            concurrency: default_concurrency(),
            transliterate: false,
            to_script: default_to_script(),
            failure_policy: FailurePolicy::default(),
            cache: true,
        }
    }
}

/// Patterns kept away from the provider
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProtectionConfig {
    /// Regular expressions for text to protect, on top of format specifiers
    #[serde(default = "default_protected_patterns")]
    pub patterns: Vec<String>,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            patterns: default_protected_patterns(),
        }
    }
}

impl ProtectionConfig {
    /// Compile the patterns into a mask
    pub fn mask(&self) -> Result<PlaceholderMask, ConfigError> {
        PlaceholderMask::new(&self.patterns)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
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
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

fn default_source_language() -> String {
    language_utils::AUTO_DETECT.to_string()
}

fn default_api_version() -> String {
    "3.0".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_pool_max_size() -> usize {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500 // 500ms base backoff time, doubled on each retry
}

fn default_concurrency() -> usize {
    10
}

fn default_to_script() -> String {
    "Latn".to_string()
}

fn default_true() -> bool {
    true
}

fn default_protected_patterns() -> Vec<String> {
    DEFAULT_PROTECTED_PATTERNS.iter().map(|p| p.to_string()).collect()
}

impl Config {
    /// Load a configuration file; missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Overlay `AZURE_TRANSLATOR_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_overrides_with(|name| std::env::var(name).ok())
    }

    /// Overlay `AZURE_TRANSLATOR_*` variables read through `lookup`
    ///
    /// Any of them being set puts an Azure link at the head of the chain.
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let key = get("AZURE_TRANSLATOR_KEY");
        let region = get("AZURE_TRANSLATOR_REGION");
        let endpoint = get("AZURE_TRANSLATOR_ENDPOINT");
        let api_version = get("AZURE_TRANSLATOR_API_VERSION");
        let category = get("AZURE_TRANSLATOR_CATEGORY");
        let text_type = get("AZURE_TRANSLATOR_TEXT_TYPE")
            .map(|v| v.parse::<TextType>())
            .transpose()
            .context("AZURE_TRANSLATOR_TEXT_TYPE")?;

        if key.is_none() && self.translation.get_provider_config(ProviderKind::Azure).is_none() {
            return Ok(());
        }

        let azure = self.translation.azure_mut();
        if let Some(key) = key {
            azure.api_key = key;
        }
        if let Some(region) = region {
            azure.region = region;
        }
        if let Some(endpoint) = endpoint {
            azure.endpoint = endpoint;
        }
        if let Some(api_version) = api_version {
            azure.api_version = api_version;
        }
        if let Some(category) = category {
            azure.category = category;
        }
        if let Some(text_type) = text_type {
            azure.text_type = text_type;
        }
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        language_utils::validate_language_code(&self.source_language, true).map_err(|e| ConfigError::Invalid {
            field: "source_language".to_string(),
            reason: e.to_string(),
        })?;

        if self.target_languages.is_empty() {
            return Err(ConfigError::Missing("target_languages".to_string()));
        }
        let mut seen = HashSet::new();
        for target in &self.target_languages {
            let tag = language_utils::validate_language_code(target, false)
                .and_then(|_| LocaleTag::parse(target))
                .map_err(|e| ConfigError::Invalid {
                    field: "target_languages".to_string(),
                    reason: e.to_string(),
                })?;
            if !seen.insert(tag.to_code()) {
                return Err(invalid("target_languages", &format!("'{}' is listed more than once", target)));
            }
        }

        // Validate API key for keyed providers
        for provider in &self.translation.providers {
            if provider.provider_type == ProviderKind::Azure && provider.api_key.trim().is_empty() {
                return Err(ConfigError::Missing("Azure Translator API key".to_string()));
            }
            if provider.concurrent_requests == Some(0) {
                return Err(invalid("concurrent_requests", "must be at least 1"));
            }
            url::Url::parse(&provider.effective_endpoint())
                .map_err(|e| invalid("endpoint", &format!("{}: {}", provider.effective_endpoint(), e)))?;
        }

        let common = &self.translation.common;
        if common.timeout_secs == 0 {
            return Err(invalid("timeout_secs", "must be at least 1"));
        }
        if common.pool_max_size == 0 {
            return Err(invalid("pool_max_size", "must be at least 1"));
        }
        if common.max_attempts == 0 {
            return Err(invalid("max_attempts", "must be at least 1"));
        }
        if common.concurrency == 0 {
            return Err(invalid("concurrency", "must be at least 1"));
        }
        // Chains without a transliterating provider fall back to plain translations
        if common.transliterate
            && (common.to_script.len() != 4 || !common.to_script.chars().all(|c| c.is_ascii_alphabetic()))
        {
            return Err(invalid("to_script", "expected a four letter script code such as Latn"));
        }

        self.protection.mask()?;
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_languages: Vec::new(),
            translation: TranslationConfig::default(),
            protection: ProtectionConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
