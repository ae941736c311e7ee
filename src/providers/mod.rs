/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for machine translation backends:
 * - Azure: Microsoft Translator v3 REST API
 * - Google: the free `translate_a/single` endpoint
 * - LibreTranslate: self-hosted or public LibreTranslate servers
 * - Mock: scripted behaviours for tests
 *
 * Providers make exactly one request per call, which may carry several texts
 * for services with a batch API. Retries, backoff and fallback between
 * providers live in `translation::chain`.
 */

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::app_config::{ProviderConfig, ProviderKind};
use crate::errors::{ConfigError, ProviderError};

pub use self::azure::AzureTranslator;
pub use self::google::GoogleTranslator;
pub use self::libretranslate::LibreTranslate;

pub mod azure;
pub mod google;
pub mod http;
pub mod libretranslate;
pub mod mock;

/// Per-request knobs that are not part of the text itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Target script for transliteration (ISO 15924, e.g. `Latn`)
    pub to_script: Option<String>,
}

impl TranslateOptions {
    /// Options asking for output in the given script
    pub fn transliterate(script: impl Into<String>) -> Self {
        Self {
            to_script: Some(script.into()),
        }
    }
}

/// Common trait for all translation backends
///
/// Implementations must be cheap to share across worker tasks.
#[async_trait]
pub trait TranslationProvider: Send + Sync + Debug {
    /// Short name used in logs and results
    fn name(&self) -> &str;

    /// Whether `options.to_script` is honoured
    fn supports_transliteration(&self) -> bool {
        false
    }

    /// Translate one text
    ///
    /// `source_lang` may be `auto`. Providers that cannot transliterate ignore
    /// `options.to_script` and return the plain translation.
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        options: &TranslateOptions,
    ) -> Result<String, ProviderError>;

    /// Most texts accepted by one [`translate_batch`](Self::translate_batch) call
    fn max_batch_size(&self) -> usize {
        1
    }

    /// Translate several texts, returning the outputs in input order
    ///
    /// The default makes one `translate` call per text.
    async fn translate_batch(
        &self,
        texts: &[&str],
        source_lang: &str,
        target_lang: &str,
        options: &TranslateOptions,
    ) -> Result<Vec<String>, ProviderError> {
        let mut translated = Vec::with_capacity(texts.len());
        for text in texts {
            translated.push(self.translate(text, source_lang, target_lang, options).await?);
        }
        Ok(translated)
    }
}

/// Instantiate a provider from its configuration, sharing one HTTP client
pub fn from_config(config: &ProviderConfig, client: Client) -> Result<Arc<dyn TranslationProvider>, ConfigError> {
    let provider: Arc<dyn TranslationProvider> = match config.provider_type {
        ProviderKind::Azure => Arc::new(AzureTranslator::new(client, config)?),
        ProviderKind::Google => Arc::new(GoogleTranslator::new(client, config)),
        ProviderKind::LibreTranslate => Arc::new(LibreTranslate::new(client, config)),
    };
    log::debug!("Configured provider {}", provider.name());
    Ok(provider)
}
