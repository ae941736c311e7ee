/*!
 * End-to-end tests for translating a single strings.xml file
 */

use anyhow::Result;

use droidlingo::app_controller::{Controller, OutputMode};
use droidlingo::errors::ProviderError;
use droidlingo::file_utils::FileManager;
use droidlingo::providers::mock::MockProvider;
use droidlingo::resources::ResourceDocument;
use droidlingo::translation::FailurePolicy;
use crate::common;
use crate::common::sample_resources::APP_STRINGS;

fn controller(targets: &[&str], provider: MockProvider) -> Result<Controller> {
    common::init_logging();
    Ok(Controller::with_chain(common::test_config("en", targets), common::mock_chain(&[provider], 2))?.without_progress())
}

#[tokio::test]
async fn test_translate_file_withTwoLanguages_shouldWriteFilesBesideInput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "values/strings.xml", APP_STRINGS)?;

    let summary = controller(&["fr", "de"], MockProvider::working())?
        .translate_file(&input, OutputMode::Beside)
        .await?;

    assert!(summary.is_success());
    assert_eq!(summary.failed_units, 0);
    let languages: Vec<_> = summary.written.iter().map(|(lang, _)| lang.as_str()).collect();
    assert_eq!(languages, vec!["fr", "de"]);

    let fr = common::read(&temp_dir.path().join("values/strings-fr.xml"))?;
    assert!(fr.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
    assert!(fr.contains("<!-- Main strings -->"));
    assert!(fr.contains(r#"<string name="app_name" translatable="false">Droid Notes</string>"#));
    assert!(fr.contains(r"[fr] Hello %1$s, you have \n%d items</string>"));
    assert!(fr.contains("[fr] Tap <b>here</b> to continue</string>"));
    assert!(fr.contains(r"[fr] Don\'t &amp; won\'t</string>"));
    assert!(fr.contains(r#"<string name="empty"></string>"#));
    assert!(fr.contains(r#"<string name="only_placeholder">%1$d%%</string>"#));
    assert!(fr.contains("<item>[fr] Mercury</item>"));
    assert!(fr.contains(r#"<item quantity="other">[fr] %d notes</item>"#));
    assert!(fr.contains(r#"<dimen name="margin">16dp</dimen>"#));
    assert!(ResourceDocument::parse(fr.as_bytes()).is_ok());

    let de = common::read(&temp_dir.path().join("values/strings-de.xml"))?;
    assert!(de.contains("<item>[de] Venus</item>"));
    // Input untouched
    assert_eq!(common::read(&input)?, APP_STRINGS);
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withIdentityProvider_shouldKeepBytes() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "strings.xml", APP_STRINGS)?;

    controller(&["it"], MockProvider::identity())?
        .translate_file(&input, OutputMode::Beside)
        .await?;

    assert_eq!(common::read(&temp_dir.path().join("strings-it.xml"))?, APP_STRINGS);
    Ok(())
}

#[tokio::test]
async fn test_translate_file_inPlace_shouldRequireSingleTarget() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "strings.xml", APP_STRINGS)?;

    let result = controller(&["fr", "de"], MockProvider::working())?
        .translate_file(&input, OutputMode::InPlace)
        .await;
    assert!(result.is_err());
    assert_eq!(common::read(&input)?, APP_STRINGS);

    let summary = controller(&["fr"], MockProvider::working())?
        .translate_file(&input, OutputMode::InPlace)
        .await?;
    assert_eq!(summary.written, vec![("fr".to_string(), input.clone())]);
    assert!(common::read(&input)?.contains("<item>[fr] Earth</item>"));
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withTransliteration_shouldUseTranslitFileName() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "strings.xml", APP_STRINGS)?;
    let mut config = common::test_config("en", &["sr"]);
    config.translation.common.transliterate = true;
    let chain = common::mock_chain(&[MockProvider::working().with_transliteration()], 1);

    Controller::with_chain(config, chain)?
        .without_progress()
        .translate_file(&input, OutputMode::Beside)
        .await?;

    let output = temp_dir.path().join("strings-translit-sr.xml");
    assert!(FileManager::file_exists(&output));
    assert!(common::read(&output)?.contains("<item>[sr-Latn] Mercury</item>"));
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withTransliterationOnPlainChain_shouldWritePlainTranslation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "strings.xml", APP_STRINGS)?;
    let mut config = common::test_config("en", &["sr"]);
    config.translation.common.transliterate = true;
    assert!(config.validate().is_ok());

    let summary = Controller::with_chain(config, common::mock_chain(&[MockProvider::working()], 1))?
        .without_progress()
        .translate_file(&input, OutputMode::Beside)
        .await?;

    assert!(summary.is_success());
    let output = common::read(&temp_dir.path().join("strings-translit-sr.xml"))?;
    assert!(output.contains("<item>[sr] Mercury</item>"));
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withMixedResources_shouldCountEachKind() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "strings.xml", APP_STRINGS)?;

    let summary = controller(&["fr"], MockProvider::working())?
        .translate_file(&input, OutputMode::Beside)
        .await?;

    assert_eq!(summary.counts.len(), 1);
    let (language, counts) = &summary.counts[0];
    assert_eq!(language, "fr");
    assert_eq!((counts.strings, counts.arrays, counts.array_items), (3, 1, 3));
    assert_eq!((counts.plurals, counts.plural_items), (1, 2));
    Ok(())
}

#[test]
fn test_controller_withDuplicateTargets_shouldBeRejected() {
    let config = common::test_config("en", &["fr", "fr"]);
    let result = Controller::with_chain(config, common::mock_chain(&[MockProvider::working()], 1));
    assert!(result.is_err());
}

#[tokio::test]
async fn test_translate_file_withRejectedCredentials_shouldWriteNothing() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "strings.xml", APP_STRINGS)?;
    let provider = MockProvider::failing(ProviderError::AuthenticationError("401".to_string()));

    let summary = controller(&["fr", "de"], provider)?
        .translate_file(&input, OutputMode::Beside)
        .await?;

    assert!(!summary.is_success());
    assert_eq!(summary.failed_languages, vec!["fr".to_string(), "de".to_string()]);
    assert!(summary.written.is_empty());
    assert!(!FileManager::file_exists(temp_dir.path().join("strings-fr.xml")));
    assert!(!FileManager::file_exists(temp_dir.path().join("strings-de.xml")));
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withCorruptingProvider_shouldFollowFailurePolicy() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "strings.xml", APP_STRINGS)?;

    // Default policy keeps source text for broken units and still writes
    let summary = controller(&["fr"], MockProvider::corrupting())?
        .translate_file(&input, OutputMode::Beside)
        .await?;
    assert!(summary.is_success());
    assert!(summary.failed_units > 0);
    let fr = common::read(&temp_dir.path().join("strings-fr.xml"))?;
    assert!(fr.contains(r#"<string name="greeting">Hello %1$s, you have \n%d items</string>"#));
    assert!(fr.contains("<item>[fr] Mercury</item>"));

    let mut config = common::test_config("en", &["de"]);
    config.translation.common.failure_policy = FailurePolicy::MarkIncomplete;
    let summary = Controller::with_chain(config, common::mock_chain(&[MockProvider::corrupting()], 1))?
        .without_progress()
        .translate_file(&input, OutputMode::Beside)
        .await?;
    assert_eq!(summary.failed_languages, vec!["de".to_string()]);
    assert!(!FileManager::file_exists(temp_dir.path().join("strings-de.xml")));
    Ok(())
}

#[test]
fn test_translate_file_withMissingOrBrokenInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = controller(&["fr"], MockProvider::working())?;
    let broken = common::create_test_file(temp_dir.path(), "broken.xml", "<resources><string name=\"a\">x")?;

    let (missing, malformed) = tokio_test::block_on(async {
        (
            controller
                .translate_file(&temp_dir.path().join("absent.xml"), OutputMode::Beside)
                .await,
            controller.translate_file(&broken, OutputMode::Beside).await,
        )
    });

    assert!(missing.is_err());
    assert!(malformed.is_err());
    assert!(!FileManager::file_exists(temp_dir.path().join("broken-fr.xml")));
    Ok(())
}
