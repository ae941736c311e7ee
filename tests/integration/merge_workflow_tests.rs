/*!
 * End-to-end tests for merging a resource directory and translating the result
 */

use anyhow::Result;

use droidlingo::app_controller::Controller;
use droidlingo::providers::mock::MockProvider;
use crate::common;
use crate::common::sample_resources::{BASE_VALUES, NIGHT_VALUES, SPANISH_VALUES};

fn project(root: &std::path::Path) -> Result<std::path::PathBuf> {
    common::create_res_dir(
        root,
        &[
            ("values", BASE_VALUES),
            ("values-es", SPANISH_VALUES),
            ("values-night", NIGHT_VALUES),
        ],
    )
}

fn controller(targets: &[&str], provider: &MockProvider) -> Result<Controller> {
    common::init_logging();
    Ok(
        Controller::with_chain(common::test_config("en", targets), common::mock_chain(&[provider.clone()], 1))?
            .without_progress(),
    )
}

#[tokio::test]
async fn test_merge_resources_withDefaultOrder_shouldTranslateFromEachOrigin() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let res_dir = project(temp_dir.path())?;
    let provider = MockProvider::working();

    let summary = controller(&["fr"], &provider)?.merge_resources(&res_dir, None).await?;

    assert!(summary.is_success());
    assert!(summary.conflicts >= 4);
    let output = res_dir.join("values-fr/strings.xml");
    assert_eq!(summary.written, vec![("fr".to_string(), output.clone())]);

    let fr = common::read(&output)?;
    assert!(fr.contains(r#"<string name="app_name" translatable="false">Droid Notes</string>"#));
    assert!(fr.contains(r#"<string name="title">[fr] Notes</string>"#));
    assert!(fr.contains(r#"<string name="save">[fr] Guardar</string>"#));
    assert!(fr.contains(r#"<string name="delete">[fr] Borrar</string>"#));
    assert!(fr.contains(r#"<item quantity="many">[fr] %d notas</item>"#));
    assert!(!fr.contains("Night"));

    let sources: Vec<(String, String)> = provider
        .requests()
        .into_iter()
        .map(|r| (r.text, r.source_language))
        .collect();
    assert!(sources.contains(&("Notes".to_string(), "en".to_string())));
    assert!(sources.contains(&("Guardar".to_string(), "es".to_string())));
    Ok(())
}

#[tokio::test]
async fn test_merge_resources_withExistingLocaleAsTarget_shouldKeepItsOwnStrings() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let res_dir = project(temp_dir.path())?;
    let provider = MockProvider::working();

    controller(&["es"], &provider)?.merge_resources(&res_dir, None).await?;

    let es = common::read(&res_dir.join("values-es/strings.xml"))?;
    assert!(es.contains(r#"<string name="save">Guardar</string>"#));
    assert!(es.contains(r#"<string name="title">[es] Notes</string>"#));
    assert!(provider.requests().iter().all(|r| r.source_language == "en"));
    // The base locale is never rewritten
    assert_eq!(common::read(&res_dir.join("values/strings.xml"))?, BASE_VALUES);
    Ok(())
}

#[tokio::test]
async fn test_merge_resources_withExplicitPrecedence_shouldLetBaseWin() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let res_dir = project(temp_dir.path())?;
    let precedence = vec!["es".to_string(), "en".to_string()];

    controller(&["de"], &MockProvider::working())?
        .merge_resources(&res_dir, Some(precedence.as_slice()))
        .await?;

    let de = common::read(&res_dir.join("values-de/strings.xml"))?;
    assert!(de.contains(r#"<string name="save">[de] Save</string>"#));
    assert!(de.contains(r#"<string name="delete">[de] Borrar</string>"#));
    assert!(!de.contains("many"));
    Ok(())
}

#[tokio::test]
async fn test_merge_resources_withBadInputs_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = controller(&["fr"], &MockProvider::working())?;

    assert!(controller.merge_resources(&temp_dir.path().join("res"), None).await.is_err());

    let empty = common::create_res_dir(temp_dir.path(), &[("values-night", NIGHT_VALUES)])?;
    assert!(controller.merge_resources(&empty, None).await.is_err());

    let res_dir = project(temp_dir.path())?;
    let unranked = vec!["en".to_string()];
    assert!(controller.merge_resources(&res_dir, Some(unranked.as_slice())).await.is_err());
    assert!(!res_dir.join("values-fr").exists());
    Ok(())
}
