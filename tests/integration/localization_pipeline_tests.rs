/*!
 * Tests for the document localization pipeline without any file system access
 */

use std::collections::HashMap;

use parking_lot::Mutex;

use droidlingo::errors::ProviderError;
use droidlingo::providers::mock::MockProvider;
use droidlingo::resources::{ResourceDocument, UnitId};
use droidlingo::translation::{Localizer, PlaceholderMask, TranslationCache};
use crate::common;
use crate::common::sample_resources::APP_STRINGS;

fn langs(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn localizer(providers: &[MockProvider]) -> Localizer {
    Localizer::new(common::mock_chain(providers, 2), PlaceholderMask::default(), 4)
}

#[tokio::test]
async fn test_localize_withManyLanguages_shouldReportInRequestedOrder() {
    let doc = ResourceDocument::parse(APP_STRINGS.as_bytes()).unwrap();
    let streamed = Mutex::new(Vec::new());

    let report = localizer(&[MockProvider::slow(5)])
        .localize_with(
            &doc,
            "en",
            None,
            &langs(&["ja", "fr", "de", "pt-BR"]),
            |localized| streamed.lock().push(localized.language.clone()),
            |_, _| {},
        )
        .await;

    assert!(report.is_success());
    let order: Vec<_> = report.documents.iter().map(|d| d.language.as_str()).collect();
    assert_eq!(order, vec!["ja", "fr", "de", "pt-BR"]);
    let mut streamed = streamed.into_inner();
    streamed.sort();
    assert_eq!(streamed, vec!["de", "fr", "ja", "pt-BR"]);

    for localized in &report.documents {
        let reparsed = ResourceDocument::parse(&localized.document.serialize()).unwrap();
        let names: Vec<_> = reparsed.entries().iter().map(|e| e.name().to_string()).collect();
        let original: Vec<_> = doc.entries().iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, original);
    }
}

#[tokio::test]
async fn test_localize_withFailingPrimary_shouldUseFallbackForEveryUnit() {
    let doc = ResourceDocument::parse(APP_STRINGS.as_bytes()).unwrap();
    let primary = MockProvider::failing(ProviderError::from_status(400, "unsupported language", None)).named("primary");
    let fallback = MockProvider::working().named("fallback");

    let report = localizer(&[primary.clone(), fallback.clone()])
        .localize(&doc, "en", &langs(&["fr"]))
        .await;

    let fr = report.document("fr").unwrap();
    assert!(fr.failures.is_empty());
    assert_eq!(primary.request_count(), fallback.request_count());
    assert_eq!(
        fr.document.value(&UnitId::ArrayItem {
            name: "planets".to_string(),
            index: 2
        }),
        Some("[fr] Earth")
    );
}

#[tokio::test]
async fn test_localize_withBomAndCrlf_shouldKeepLayout() {
    let mut bytes = b"\xEF\xBB\xBF".to_vec();
    bytes.extend_from_slice(APP_STRINGS.replace('\n', "\r\n").as_bytes());
    let doc = ResourceDocument::parse(&bytes).unwrap();

    let report = localizer(&[MockProvider::working()]).localize(&doc, "en", &langs(&["nl"])).await;
    let out = report.document("nl").unwrap().document.serialize();

    assert!(out.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(out[3..].to_vec()).unwrap();
    assert!(text.contains("<item>[nl] Venus</item>\r\n"));
    assert_eq!(text.matches("\r\n").count(), APP_STRINGS.matches('\n').count());
}

#[tokio::test]
async fn test_localize_withRepeatedTexts_shouldAskProviderOnce() {
    let xml = r#"<resources>
    <string name="ok">OK</string>
    <string name="ok_again">OK</string>
    <string-array name="buttons"><item>OK</item><item>Cancel</item></string-array>
</resources>"#;
    let doc = ResourceDocument::parse(xml.as_bytes()).unwrap();
    let provider = MockProvider::working();
    let localizer = Localizer::new(common::mock_chain(&[provider.clone()], 1), PlaceholderMask::default(), 1)
        .with_cache(TranslationCache::new(true));

    let report = localizer.localize(&doc, "en", &langs(&["sv"])).await;

    assert_eq!(provider.request_count(), 2);
    assert_eq!(report.document("sv").unwrap().translated, 4);
}

#[tokio::test]
async fn test_localize_withOrigins_shouldOverrideSourcePerLeaf() {
    let doc = ResourceDocument::parse(APP_STRINGS.as_bytes()).unwrap();
    let provider = MockProvider::working();
    let localizer = localizer(&[provider.clone()]);
    let mut origins = HashMap::new();
    origins.insert(UnitId::String { name: "greeting".to_string() }, "de".to_string());

    let report = localizer
        .localize_with(&doc, "auto", Some(&origins), &langs(&["de"]), |_| {}, |_, _| {})
        .await;

    let de = report.document("de").unwrap();
    assert_eq!(
        de.document.value(&UnitId::String { name: "greeting".to_string() }),
        Some(r"Hello %1$s, you have \n%d items")
    );
    assert!(provider.requests().iter().all(|r| r.source_language == "auto"));
    assert!(provider.request_count() > 0);
}
