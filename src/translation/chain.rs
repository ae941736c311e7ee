/*!
 * Ordered fallback chain of providers with one shared retry policy.
 *
 * - transient errors (rate limits, 5xx, timeouts, connection failures) are
 *   retried on the same provider with exponential backoff and jitter
 * - permanent errors move on to the next provider
 * - authentication failures disable the provider for the rest of the run
 *
 * When every provider is disabled the chain reports a fatal outcome for the
 * language being translated.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, error, warn};
use rand::Rng;
use reqwest::Client;
use tokio::sync::Semaphore;

use super::concurrency::ProviderProfile;
use crate::app_config::{Config, TranslationCommonConfig};
use crate::errors::{ConfigError, FatalBatchError, ProviderError};
use crate::providers::{self, TranslateOptions, TranslationProvider};

/// Longest server-requested wait that is honoured as is
const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Outcome of translating one text through the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResult {
    /// Translation, or the input when nothing succeeded
    pub text: String,
    /// Whether a provider produced `text`
    pub succeeded: bool,
    /// Provider that produced `text`
    pub provider_used: Option<String>,
    /// Requests sent across the whole chain
    pub attempts: u32,
    /// Last error seen, for reporting
    pub error: Option<String>,
}

impl ProviderResult {
    /// Text that needed no provider at all
    pub fn passthrough(text: &str) -> Self {
        Self {
            text: text.to_string(),
            succeeded: true,
            provider_used: None,
            attempts: 0,
            error: None,
        }
    }

    /// Job skipped because its language was abandoned
    pub fn cancelled(text: &str) -> Self {
        Self {
            text: text.to_string(),
            succeeded: false,
            provider_used: None,
            attempts: 0,
            error: Some("cancelled".to_string()),
        }
    }

    /// Job that triggered or hit a fatal outcome
    pub fn failed(text: &str, attempts: u32, error: impl Into<String>) -> Self {
        Self {
            text: text.to_string(),
            succeeded: false,
            provider_used: None,
            attempts,
            error: Some(error.into()),
        }
    }
}

/// Backoff settings shared by every provider in a chain
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Requests per provider before moving on
    pub max_attempts: u32,
    /// First backoff, doubled on every retry
    pub backoff_base_ms: u64,
    /// Cap on the computed backoff
    pub max_backoff_ms: u64,
    /// Upper bound of the random extra wait
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 500,
            max_backoff_ms: 10_000,
            jitter_ms: 300,
        }
    }
}

impl RetryPolicy {
    pub fn from_common(common: &TranslationCommonConfig) -> Self {
        Self {
            max_attempts: common.max_attempts.max(1),
            backoff_base_ms: common.retry_backoff_ms,
            ..Self::default()
        }
    }

    /// Exponential part of the wait before retry number `attempt + 1`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(20);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor).min(self.max_backoff_ms))
    }

    /// Full wait after a failed `attempt`, honouring Retry-After hints
    pub fn delay(&self, attempt: u32, error: &ProviderError) -> Duration {
        let mut delay = self.backoff(attempt);
        if let ProviderError::RateLimitExceeded {
            retry_after_secs: Some(secs),
            ..
        } = error
        {
            delay = delay.max(Duration::from_secs((*secs).min(MAX_RETRY_AFTER_SECS)));
        }
        if self.jitter_ms > 0 {
            delay += Duration::from_millis(rand::rng().random_range(0..=self.jitter_ms));
        }
        delay
    }
}

#[derive(Debug)]
struct ChainLink {
    provider: Arc<dyn TranslationProvider>,
    limiter: Semaphore,
    disabled: AtomicBool,
}

/// Providers tried in order, each behind its own in-flight limit
#[derive(Debug)]
pub struct ProviderChain {
    links: Vec<ChainLink>,
    policy: RetryPolicy,
    request_timeout: Duration,
}

impl ProviderChain {
    pub fn new(policy: RetryPolicy, request_timeout: Duration) -> Self {
        Self {
            links: Vec::new(),
            policy,
            request_timeout,
        }
    }

    /// Append a provider allowing `max_in_flight` concurrent requests
    pub fn with_provider(mut self, provider: Arc<dyn TranslationProvider>, max_in_flight: usize) -> Self {
        self.links.push(ChainLink {
            provider,
            limiter: Semaphore::new(max_in_flight.max(1)),
            disabled: AtomicBool::new(false),
        });
        self
    }

    /// Build the configured chain, sharing one HTTP client between providers
    pub fn from_config(config: &Config, client: Client) -> Result<Self, ConfigError> {
        let common = &config.translation.common;
        let mut chain = Self::new(
            RetryPolicy::from_common(common),
            Duration::from_secs(common.timeout_secs),
        );
        for provider_config in config.translation.chain() {
            let provider = providers::from_config(&provider_config, client.clone())?;
            let in_flight = ProviderProfile::for_provider(provider_config.provider_type)
                .effective_concurrent_requests(provider_config.concurrent_requests);
            chain = chain.with_provider(provider, in_flight);
        }
        if chain.links.is_empty() {
            return Err(ConfigError::Missing("at least one translation provider".to_string()));
        }
        Ok(chain)
    }

    /// Provider names in chain order
    pub fn provider_names(&self) -> Vec<String> {
        self.links.iter().map(|l| l.provider.name().to_string()).collect()
    }

    /// Whether any provider is still enabled
    pub fn has_usable_provider(&self) -> bool {
        self.links.iter().any(|l| !l.disabled.load(Ordering::SeqCst))
    }

    /// Whether some enabled provider can honour a transliteration request
    pub fn can_transliterate(&self) -> bool {
        self.links
            .iter()
            .any(|l| !l.disabled.load(Ordering::SeqCst) && l.provider.supports_transliteration())
    }

    /// Largest batch any enabled provider accepts
    pub fn max_batch_size(&self) -> usize {
        self.links
            .iter()
            .filter(|l| !l.disabled.load(Ordering::SeqCst))
            .map(|l| l.provider.max_batch_size())
            .max()
            .unwrap_or(1)
            .max(1)
    }

    /// Translate `text`, falling back through the chain
    ///
    /// `cancel` is checked before every request. The outer whitespace of `text`
    /// is re-applied to the provider output.
    pub async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        options: &TranslateOptions,
        cancel: &AtomicBool,
    ) -> Result<ProviderResult, FatalBatchError> {
        let mut results = self
            .translate_batch(&[text], source_lang, target_lang, options, cancel)
            .await?;
        Ok(results
            .pop()
            .unwrap_or_else(|| ProviderResult::failed(text, 0, "no result")))
    }

    /// Translate several texts, one result per text in input order
    ///
    /// Each provider receives the texts still unresolved, split into requests of
    /// at most its batch size. A request that fails for good moves all of its
    /// texts on to the next provider.
    pub async fn translate_batch(
        &self,
        texts: &[&str],
        source_lang: &str,
        target_lang: &str,
        options: &TranslateOptions,
        cancel: &AtomicBool,
    ) -> Result<Vec<ProviderResult>, FatalBatchError> {
        let parts: Vec<(&str, &str, &str)> = texts.iter().map(|t| split_outer_whitespace(t)).collect();
        let mut results: Vec<Option<ProviderResult>> = texts
            .iter()
            .zip(&parts)
            .map(|(text, (_, core, _))| core.is_empty().then(|| ProviderResult::passthrough(text)))
            .collect();
        let mut attempts = vec![0u32; texts.len()];
        let mut pending: Vec<usize> = (0..texts.len()).filter(|&i| results[i].is_none()).collect();
        let mut last_error: Option<ProviderError> = None;

        for link in &self.links {
            if pending.is_empty() {
                break;
            }
            let name = link.provider.name();
            let mut unresolved = Vec::new();

            for chunk in pending.chunks(link.provider.max_batch_size().max(1)) {
                if link.disabled.load(Ordering::SeqCst) {
                    unresolved.extend_from_slice(chunk);
                    continue;
                }
                let cores: Vec<&str> = chunk.iter().map(|&i| parts[i].1).collect();
                let (outcome, requests) = self
                    .send_with_retry(link, &cores, source_lang, target_lang, options, cancel)
                    .await;
                for &i in chunk {
                    attempts[i] += requests;
                }

                match outcome {
                    LinkOutcome::Translated(translated) => {
                        for (&i, output) in chunk.iter().zip(translated) {
                            if output.trim().is_empty() {
                                warn!("{} returned an empty translation for {}", name, target_lang);
                                last_error = Some(ProviderError::ParseError("empty translation".to_string()));
                                unresolved.push(i);
                                continue;
                            }
                            let (lead, _, trail) = parts[i];
                            results[i] = Some(ProviderResult {
                                text: format!("{}{}{}", lead, output.trim(), trail),
                                succeeded: true,
                                provider_used: Some(name.to_string()),
                                attempts: attempts[i],
                                error: None,
                            });
                        }
                    }
                    LinkOutcome::Failed(e) => {
                        warn!("{} failed for {}: {} - trying next provider", name, target_lang, e);
                        last_error = Some(e);
                        unresolved.extend_from_slice(chunk);
                    }
                    LinkOutcome::Cancelled => {
                        return Ok(texts
                            .iter()
                            .enumerate()
                            .map(|(i, text)| {
                                results[i].take().unwrap_or_else(|| {
                                    let mut result = ProviderResult::cancelled(text);
                                    result.attempts = attempts[i];
                                    result
                                })
                            })
                            .collect());
                    }
                }
            }
            pending = unresolved;
        }

        if pending.is_empty() {
            return Ok(results
                .into_iter()
                .zip(texts)
                .map(|(result, text)| result.unwrap_or_else(|| ProviderResult::passthrough(text)))
                .collect());
        }

        let reason = last_error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no usable translation provider".to_string());

        if !self.has_usable_provider() {
            return Err(FatalBatchError {
                language: target_lang.to_string(),
                reason,
            });
        }
        Ok(results
            .into_iter()
            .zip(texts)
            .enumerate()
            .map(|(i, (result, text))| {
                result.unwrap_or_else(|| ProviderResult::failed(text, attempts[i], reason.clone()))
            })
            .collect())
    }

    /// Send one request to `link`, retrying transient errors
    ///
    /// Returns the outcome and the number of requests sent.
    async fn send_with_retry(
        &self,
        link: &ChainLink,
        texts: &[&str],
        source_lang: &str,
        target_lang: &str,
        options: &TranslateOptions,
        cancel: &AtomicBool,
    ) -> (LinkOutcome, u32) {
        let name = link.provider.name();
        let mut requests = 0u32;

        for attempt in 1..=self.policy.max_attempts {
            if cancel.load(Ordering::SeqCst) {
                return (LinkOutcome::Cancelled, requests);
            }
            requests += 1;

            match self.send(link, texts, source_lang, target_lang, options).await {
                Ok(translated) => {
                    debug!(
                        "{} translated {} text(s) to {} on attempt {}",
                        name,
                        texts.len(),
                        target_lang,
                        attempt
                    );
                    return (LinkOutcome::Translated(translated), requests);
                }
                Err(e) if e.is_fatal() => {
                    error!("{} rejected credentials, disabling it for this run: {}", name, e);
                    link.disabled.store(true, Ordering::SeqCst);
                    return (LinkOutcome::Failed(e), requests);
                }
                Err(e) if e.is_retriable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay(attempt, &e);
                    warn!(
                        "{} error: {} - attempt {}/{}, retrying in {} ms",
                        name,
                        e,
                        attempt,
                        self.policy.max_attempts,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return (LinkOutcome::Failed(e), requests),
            }
        }
        (
            LinkOutcome::Failed(ProviderError::RequestFailed("no attempts allowed".to_string())),
            requests,
        )
    }

    async fn send(
        &self,
        link: &ChainLink,
        texts: &[&str],
        source_lang: &str,
        target_lang: &str,
        options: &TranslateOptions,
    ) -> Result<Vec<String>, ProviderError> {
        let _permit = link
            .limiter
            .acquire()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Request limiter closed: {}", e)))?;

        let translated = tokio::time::timeout(
            self.request_timeout,
            link.provider.translate_batch(texts, source_lang, target_lang, options),
        )
        .await
        .map_err(|_| ProviderError::Timeout(self.request_timeout.as_secs()))??;

        if translated.len() != texts.len() {
            return Err(ProviderError::ParseError(format!(
                "{} translations for {} texts",
                translated.len(),
                texts.len()
            )));
        }
        Ok(translated)
    }
}

/// How one provider dealt with one request
enum LinkOutcome {
    Translated(Vec<String>),
    Failed(ProviderError),
    Cancelled,
}

/// Split `text` into leading whitespace, core and trailing whitespace
fn split_outer_whitespace(text: &str) -> (&str, &str, &str) {
    let start = text.len() - text.trim_start().len();
    let end = text.trim_end().len().max(start);
    (&text[..start], &text[start..end], &text[end..])
}
