/*!
 * Tests for the provider chain: retry, backoff and fallback
 */

use std::sync::atomic::AtomicBool;

use droidlingo::app_config::{ProviderConfig, ProviderKind};
use droidlingo::errors::ProviderError;
use droidlingo::providers::TranslateOptions;
use droidlingo::providers::http::build_client;
use droidlingo::providers::mock::MockProvider;
use droidlingo::translation::{ProviderChain, RetryPolicy};
use crate::common;

async fn translate(chain: &ProviderChain, text: &str, options: &TranslateOptions) -> droidlingo::translation::ProviderResult {
    chain
        .translate(text, "en", "sr", options, &AtomicBool::new(false))
        .await
        .unwrap()
}

/// A stub failing twice with a retriable error then succeeding
#[tokio::test]
async fn test_chain_withTwoTransientFailures_shouldSucceedOnThirdAttempt() {
    let stub = MockProvider::flaky(
        2,
        ProviderError::RateLimitExceeded {
            message: "slow down".to_string(),
            retry_after_secs: None,
        },
    )
    .named("stub");
    let chain = common::mock_chain(&[stub.clone()], 3);

    let result = translate(&chain, "Hello", &TranslateOptions::default()).await;
    assert!(result.succeeded);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.provider_used.as_deref(), Some("stub"));
}

#[tokio::test]
async fn test_chain_withRetriesExhausted_shouldFallBackToNextProvider() {
    let primary = MockProvider::failing(ProviderError::ConnectionError("reset".to_string())).named("primary");
    let next = MockProvider::working().named("next");
    let chain = common::mock_chain(&[primary.clone(), next.clone()], 2);

    let result = translate(&chain, "Hello", &TranslateOptions::default()).await;
    assert_eq!(result.provider_used.as_deref(), Some("next"));
    assert_eq!(result.attempts, 3);
    assert_eq!(primary.request_count(), 2);
    assert_eq!(next.request_count(), 1);
}

#[tokio::test]
async fn test_chain_withEmptyProviderOutput_shouldTreatItAsFailure() {
    let blank = MockProvider::working().named("blank").with_custom_response(|_| "   ".to_string());
    let chain = common::mock_chain(&[blank, MockProvider::working().named("next")], 3);

    let result = translate(&chain, "Hello", &TranslateOptions::default()).await;
    assert_eq!(result.provider_used.as_deref(), Some("next"));
}

#[tokio::test]
async fn test_chain_withTransliteration_shouldForwardScript() {
    let azure_like = MockProvider::working().named("translit").with_transliteration();
    let chain = common::mock_chain(&[azure_like.clone()], 1);
    assert!(chain.can_transliterate());

    let result = translate(&chain, "Zdravo", &TranslateOptions::transliterate("Latn")).await;
    assert_eq!(result.text, "[sr-Latn] Zdravo");
    assert_eq!(azure_like.requests()[0].to_script.as_deref(), Some("Latn"));
}

#[tokio::test]
async fn test_chain_withoutTransliterationSupport_shouldReturnPlainTranslation() {
    let plain = MockProvider::working().named("plain");
    let chain = common::mock_chain(&[plain], 1);
    assert!(!chain.can_transliterate());

    let result = translate(&chain, "Zdravo", &TranslateOptions::transliterate("Latn")).await;
    assert_eq!(result.text, "[sr] Zdravo");
}

#[tokio::test]
async fn test_chain_withWhitespaceOnlyText_shouldNotCallProvider() {
    let stub = MockProvider::working();
    let chain = common::mock_chain(&[stub.clone()], 1);

    let result = translate(&chain, " \n ", &TranslateOptions::default()).await;
    assert!(result.succeeded);
    assert_eq!(result.text, " \n ");
    assert_eq!(stub.request_count(), 0);
}

#[test]
fn test_chain_fromDefaultConfig_shouldUseKeylessFallback() {
    let config = common::test_config("en", &["fr"]);
    let client = build_client(5, 2).unwrap();
    let chain = ProviderChain::from_config(&config, client).unwrap();
    assert_eq!(chain.provider_names(), vec!["google", "libretranslate"]);
}

#[test]
fn test_chain_fromConfigWithAzureWithoutKey_shouldFail() {
    let mut config = common::test_config("en", &["fr"]);
    config.translation.providers = vec![ProviderConfig::new(ProviderKind::Azure)];
    let client = build_client(5, 2).unwrap();
    assert!(ProviderChain::from_config(&config, client).is_err());
}

#[test]
fn test_retry_policy_fromCommonConfig_shouldUseConfiguredValues() {
    let mut config = common::test_config("en", &["fr"]);
    config.translation.common.max_attempts = 5;
    config.translation.common.retry_backoff_ms = 250;

    let policy = RetryPolicy::from_common(&config.translation.common);
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.backoff_base_ms, 250);
}

#[tokio::test]
async fn test_chain_withBatchRejected_shouldMoveWholeBatchToNextProvider() {
    let primary = MockProvider::failing(ProviderError::from_status(400, "bad", None))
        .named("primary")
        .with_batch_size(5);
    let next = MockProvider::working().named("next");
    let chain = common::mock_chain(&[primary.clone(), next.clone()], 2);
    assert_eq!(chain.max_batch_size(), 5);

    let results = chain
        .translate_batch(&["One", "Two", "Three"], "en", "fr", &TranslateOptions::default(), &AtomicBool::new(false))
        .await
        .unwrap();

    assert_eq!(primary.request_count(), 1);
    assert_eq!(next.request_count(), 3);
    assert!(results.iter().all(|r| r.provider_used.as_deref() == Some("next")));
    assert!(results.iter().all(|r| r.attempts == 2));
    assert_eq!(results[2].text, "[fr] Three");
}

#[tokio::test]
async fn test_chain_withEmptyOutputInsideBatch_shouldRetryOnlyThatText() {
    let batching = MockProvider::working()
        .named("batching")
        .with_batch_size(10)
        .with_custom_response(|req| if req.text == "Two" { String::new() } else { format!("<{}>", req.text) });
    let next = MockProvider::working().named("next");
    let chain = common::mock_chain(&[batching.clone(), next.clone()], 1);

    let results = chain
        .translate_batch(&[" One", "Two", ""], "en", "fr", &TranslateOptions::default(), &AtomicBool::new(false))
        .await
        .unwrap();

    assert_eq!(results[0].text, " <One>");
    assert_eq!(results[1].text, "[fr] Two");
    assert_eq!(results[1].provider_used.as_deref(), Some("next"));
    assert!(results[2].succeeded && results[2].provider_used.is_none());
    assert_eq!(batching.request_count(), 1);
    assert_eq!(next.request_count(), 1);
}
