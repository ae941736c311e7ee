/*!
 * Shared HTTP plumbing for the REST providers.
 */

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response};

use crate::errors::ProviderError;

/// Build the single client shared by every provider
pub fn build_client(timeout_secs: u64, pool_max_idle_per_host: usize) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_max_idle_per_host(pool_max_idle_per_host)
        .user_agent(concat!("droidlingo/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProviderError::ConnectionError(format!("Failed to create HTTP client: {}", e)))
}

/// Classify a transport level failure
pub fn map_request_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(0)
    } else if error.is_connect() {
        ProviderError::ConnectionError(error.to_string())
    } else if error.is_decode() {
        ProviderError::ParseError(error.to_string())
    } else {
        ProviderError::RequestFailed(error.to_string())
    }
}

/// Turn a non-success response into the matching error, keeping the body as message
pub async fn error_for_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_retry_after);
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ProviderError::from_status(status.as_u16(), truncate(&body, 300), retry_after))
}

/// Retry-After in delta-seconds form; HTTP dates are ignored
pub fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
