/*!
 * Google Translate through the keyless `translate_a/single` endpoint.
 */

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;

use super::http::{error_for_status, map_request_error};
use super::{TranslateOptions, TranslationProvider};
use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;

/// Google Translate client using the `gtx` web client API
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            endpoint: config.effective_endpoint().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TranslationProvider for GoogleTranslator {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        _options: &TranslateOptions,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/translate_a/single", self.endpoint);
        let query = [
            ("client", "gtx"),
            ("sl", source_lang),
            ("tl", target_lang),
            ("dt", "t"),
            ("q", text),
        ];

        debug!("Google request {} -> {} ({} chars)", source_lang, target_lang, text.chars().count());
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(map_request_error)?;
        let response = error_for_status(response).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Google response: {}", e)))?;

        extract_text(&body)
    }
}

/// Join the translated segments of `[[["seg", "src", ...], ...], ...]`
fn extract_text(body: &Value) -> Result<String, ProviderError> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::ParseError("Google response has no segment list".to_string()))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        return Err(ProviderError::ParseError("Google response contains no text".to_string()));
    }
    Ok(text)
}
