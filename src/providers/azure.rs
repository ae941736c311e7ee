/*!
 * Microsoft Translator (Azure AI Translator) v3 client.
 */

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http::{error_for_status, map_request_error};
use super::{TranslateOptions, TranslationProvider};
use crate::app_config::ProviderConfig;
use crate::errors::{ConfigError, ProviderError};
use crate::language_utils::AUTO_DETECT;

/// Texts sent in one request
pub const MAX_BATCH_TEXTS: usize = 25;

/// Azure Translator client
#[derive(Debug, Clone)]
pub struct AzureTranslator {
    client: Client,
    endpoint: String,
    key: String,
    region: Option<String>,
    api_version: String,
    category: Option<String>,
    text_type: String,
}

/// One element of the request body
#[derive(Debug, Serialize)]
struct TranslateItem<'a> {
    #[serde(rename = "Text")]
    text: &'a str,
}

/// One element of the response array
#[derive(Debug, Deserialize)]
struct TranslateResult {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
    #[serde(default)]
    transliteration: Option<Transliteration>,
}

#[derive(Debug, Deserialize)]
struct Transliteration {
    text: String,
}

impl AzureTranslator {
    /// Create a client from provider settings; the key is required
    pub fn new(client: Client, config: &ProviderConfig) -> Result<Self, ConfigError> {
        if config.api_key.trim().is_empty() {
            return Err(ConfigError::Missing(
                "Azure Translator key (--ms-key or AZURE_TRANSLATOR_KEY)".to_string(),
            ));
        }
        Ok(Self {
            client,
            endpoint: config.effective_endpoint().trim_end_matches('/').to_string(),
            key: config.api_key.clone(),
            region: non_empty(&config.region),
            api_version: config.api_version.clone(),
            category: non_empty(&config.category),
            text_type: config.text_type.as_str().to_string(),
        })
    }

    fn query(&self, source_lang: &str, target_lang: &str, options: &TranslateOptions) -> Vec<(&'static str, String)> {
        let mut query = vec![("api-version", self.api_version.clone())];
        if source_lang != AUTO_DETECT {
            query.push(("from", source_lang.to_string()));
        }
        query.push(("to", target_lang.to_string()));
        query.push(("textType", self.text_type.clone()));
        if let Some(category) = &self.category {
            query.push(("category", category.clone()));
        }
        if let Some(script) = &options.to_script {
            query.push(("toScript", script.clone()));
        }
        query
    }
}

#[async_trait]
impl TranslationProvider for AzureTranslator {
    fn name(&self) -> &str {
        "azure"
    }

    fn supports_transliteration(&self) -> bool {
        true
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        options: &TranslateOptions,
    ) -> Result<String, ProviderError> {
        self.translate_batch(&[text], source_lang, target_lang, options)
            .await?
            .pop()
            .ok_or_else(|| ProviderError::ParseError("Azure response contains no translations".to_string()))
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_TEXTS
    }

    async fn translate_batch(
        &self,
        texts: &[&str],
        source_lang: &str,
        target_lang: &str,
        options: &TranslateOptions,
    ) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/translate", self.endpoint);
        let body: Vec<TranslateItem<'_>> = texts.iter().map(|text| TranslateItem { text }).collect();
        let mut request = self
            .client
            .post(&url)
            .query(&self.query(source_lang, target_lang, options))
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .json(&body);
        if let Some(region) = &self.region {
            request = request.header("Ocp-Apim-Subscription-Region", region);
        }

        debug!(
            "Azure request {} -> {} ({} texts, {} chars)",
            source_lang,
            target_lang,
            texts.len(),
            texts.iter().map(|t| t.chars().count()).sum::<usize>()
        );
        let response = request.send().await.map_err(map_request_error)?;
        let response = error_for_status(response).await?;
        let results: Vec<TranslateResult> = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Azure response: {}", e)))?;

        if results.len() != texts.len() {
            return Err(ProviderError::ParseError(format!(
                "Azure returned {} results for {} texts",
                results.len(),
                texts.len()
            )));
        }
        results
            .into_iter()
            .map(|result| extract_text(result, options.to_script.is_some()))
            .collect()
    }
}

fn extract_text(result: TranslateResult, transliterate: bool) -> Result<String, ProviderError> {
    let translation = result
        .translations
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::ParseError("Azure response contains no translations".to_string()))?;

    if transliterate {
        if let Some(t) = translation.transliteration.filter(|t| !t.text.is_empty()) {
            return Ok(t.text);
        }
    }
    Ok(translation.text)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
