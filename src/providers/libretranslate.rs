/*!
 * LibreTranslate client (`POST /translate`).
 */

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http::{error_for_status, map_request_error};
use super::{TranslateOptions, TranslationProvider};
use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;

/// LibreTranslate client
#[derive(Debug, Clone)]
pub struct LibreTranslate {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    format: &'static str,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl LibreTranslate {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        let api_key = config.api_key.trim();
        Self {
            client,
            endpoint: config.effective_endpoint().trim_end_matches('/').to_string(),
            api_key: (!api_key.is_empty()).then(|| api_key.to_string()),
            format: config.text_type.as_libre_format(),
        }
    }

    fn body<'a>(&'a self, text: &'a str, source_lang: &'a str, target_lang: &'a str) -> TranslateRequest<'a> {
        TranslateRequest {
            q: text,
            source: source_lang,
            target: target_lang,
            format: self.format,
            api_key: self.api_key.as_deref(),
        }
    }
}

#[async_trait]
impl TranslationProvider for LibreTranslate {
    fn name(&self) -> &str {
        "libretranslate"
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        _options: &TranslateOptions,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/translate", self.endpoint);
        debug!("LibreTranslate request {} -> {} ({} chars)", source_lang, target_lang, text.chars().count());

        let response = self
            .client
            .post(&url)
            .json(&self.body(text, source_lang, target_lang))
            .send()
            .await
            .map_err(map_request_error)?;
        let response = error_for_status(response).await?;
        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse LibreTranslate response: {}", e)))?;
        Ok(parsed.translated_text)
    }
}
