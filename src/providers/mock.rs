/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::identity()` - Echoes the input
 * - `MockProvider::working()` - Always succeeds with a tagged translation
 * - `MockProvider::flaky(n, error)` - Fails `n` times, then succeeds
 * - `MockProvider::failing(error)` - Always fails with the given error
 * - `MockProvider::corrupting()` - Succeeds but drops protected tokens
 *
 * Every mock records its requests and the peak number of calls in flight.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;

use super::{TranslateOptions, TranslationProvider};
use crate::errors::ProviderError;

static SENTINEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"__\d+_\d+__").unwrap());

/// One call received by a mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRequest {
    /// The text to translate
    pub text: String,
    /// Source language
    pub source_language: String,
    /// Target language
    pub target_language: String,
    /// Requested script, if any
    pub to_script: Option<String>,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Returns the input unchanged
    Identity,
    /// Returns `[<target>] <text>`
    Working,
    /// Fails with `error` for the first `failures` requests, then works
    Flaky { failures: usize, error: ProviderError },
    /// Always fails with `error`
    Failing(ProviderError),
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
    /// Works but strips every protected token
    Corrupting,
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    name: String,
    /// Behavior mode
    behavior: MockBehavior,
    transliteration: bool,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<MockRequest>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&MockRequest) -> String>,
    batch_size: usize,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            name: "mock".to_string(),
            behavior,
            transliteration: false,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
            batch_size: 1,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn identity() -> Self {
        Self::new(MockBehavior::Identity)
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn flaky(failures: usize, error: ProviderError) -> Self {
        Self::new(MockBehavior::Flaky { failures, error })
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    pub fn corrupting() -> Self {
        Self::new(MockBehavior::Corrupting)
    }

    /// Rename the mock, so chains can tell several apart
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Claim transliteration support
    pub fn with_transliteration(mut self) -> Self {
        self.transliteration = true;
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&MockRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Accept up to `size` texts per call
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Most calls that were running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Number of calls received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Every call received so far
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    fn respond(&self, request: &MockRequest) -> String {
        if let Some(generator) = self.custom_response {
            return generator(request);
        }
        match (&self.behavior, &request.to_script) {
            (MockBehavior::Identity, _) => request.text.clone(),
            (_, Some(script)) if self.transliteration => {
                format!("[{}-{}] {}", request.target_language, script, request.text)
            }
            _ => format!("[{}] {}", request.target_language, request.text),
        }
    }
}

#[async_trait]
impl TranslationProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_transliteration(&self) -> bool {
        self.transliteration
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
            .ok_or_else(|| ProviderError::ParseError("mock returned nothing".to_string()))
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn translate_batch(
        &self,
        texts: &[&str],
        source_lang: &str,
        target_lang: &str,
        options: &TranslateOptions,
    ) -> Result<Vec<String>, ProviderError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let result = self.answer(texts, source_lang, target_lang, options).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl MockProvider {
    async fn answer(
        &self,
        texts: &[&str],
        source_lang: &str,
        target_lang: &str,
        options: &TranslateOptions,
    ) -> Result<Vec<String>, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        let requests: Vec<MockRequest> = texts
            .iter()
            .map(|text| MockRequest {
                text: text.to_string(),
                source_language: source_lang.to_string(),
                target_language: target_lang.to_string(),
                to_script: options.to_script.clone(),
            })
            .collect();
        self.requests.lock().extend(requests.iter().cloned());

        let respond_all = || requests.iter().map(|r| self.respond(r)).collect::<Vec<_>>();
        match &self.behavior {
            MockBehavior::Identity | MockBehavior::Working => Ok(respond_all()),
            MockBehavior::Flaky { failures, error } => {
                if count < *failures {
                    Err(error.clone())
                } else {
                    Ok(respond_all())
                }
            }
            MockBehavior::Failing(error) => Err(error.clone()),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(*delay_ms)).await;
                Ok(respond_all())
            }
            MockBehavior::Corrupting => Ok(respond_all()
                .into_iter()
                .map(|text| SENTINEL.replace_all(&text, "").into_owned())
                .collect()),
        }
    }
}
