/*!
 * Tests for file and directory utilities
 */

use anyhow::Result;
use std::fs;

use droidlingo::file_utils::{FileManager, STRINGS_FILE};
use crate::common;
use crate::common::sample_resources::{BASE_VALUES, NIGHT_VALUES, SPANISH_VALUES};

#[test]
fn test_find_locale_resources_withTypicalProject_shouldListLocalesOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let res_dir = common::create_res_dir(
        temp_dir.path(),
        &[
            ("values", BASE_VALUES),
            ("values-es", SPANISH_VALUES),
            ("values-night", NIGHT_VALUES),
            ("values-pt-rBR", BASE_VALUES),
            ("values-v21", BASE_VALUES),
        ],
    )?;
    common::create_test_file(&res_dir, "values-es/plurals/strings.xml", BASE_VALUES)?;
    common::create_test_file(&res_dir, "values-de/arrays.xml", BASE_VALUES)?;

    let found = FileManager::find_locale_resources(&res_dir)?;
    let locales: Vec<_> = found.iter().map(|r| r.locale.as_deref()).collect();
    assert_eq!(locales, vec![None, Some("es"), Some("pt-BR")]);
    assert!(found.iter().all(|r| r.path.ends_with(STRINGS_FILE)));
    Ok(())
}

#[test]
fn test_find_locale_resources_withMissingDirectory_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    assert!(FileManager::find_locale_resources(temp_dir.path().join("res")).is_err());
    Ok(())
}

#[test]
fn test_read_document_withBrokenXml_shouldNameTheFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "strings.xml", "<resources><string name=\"a\">")?;

    let err = FileManager::read_document(&path).unwrap_err();
    assert!(err.to_string().contains("strings.xml"));
    assert!(FileManager::read_document(temp_dir.path().join("absent.xml")).is_err());
    Ok(())
}

#[test]
fn test_write_atomic_withNewValuesDir_shouldCreateParents() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = FileManager::values_output_path(temp_dir.path().join("res"), "zh-Hans")?;
    assert!(!FileManager::dir_exists(path.parent().unwrap()));

    FileManager::write_atomic(&path, BASE_VALUES.as_bytes())?;

    assert!(FileManager::file_exists(&path));
    assert!(path.ends_with("values-b+zh+Hans/strings.xml"));
    assert_eq!(fs::read_to_string(&path)?, BASE_VALUES);
    // No temporary files are left behind
    assert_eq!(fs::read_dir(path.parent().unwrap())?.count(), 1);
    Ok(())
}
