/*!
 * Tests for locale merging by precedence
 */

use droidlingo::errors::MergeError;
use droidlingo::resources::{LocaleMerger, LocaleSource, ResourceDocument, UnitId};
use crate::common::sample_resources::{BASE_VALUES, SPANISH_VALUES};

fn sources() -> Vec<LocaleSource> {
    vec![
        LocaleSource::new("en", ResourceDocument::parse(BASE_VALUES.as_bytes()).unwrap()),
        LocaleSource::new("es", ResourceDocument::parse(SPANISH_VALUES.as_bytes()).unwrap()),
    ]
}

fn order(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn string_id(name: &str) -> UnitId {
    UnitId::String { name: name.to_string() }
}

fn plural_id(quantity: &str) -> UnitId {
    UnitId::PluralItem {
        name: "notes".to_string(),
        quantity: quantity.to_string(),
    }
}

#[test]
fn test_merge_withSpanishOnTop_shouldOverrideAppendAndTrackOrigins() {
    let outcome = LocaleMerger::merge(&sources(), &order(&["en", "es"])).unwrap();
    let doc = &outcome.document;

    assert_eq!(doc.value(&string_id("title")), Some("Notes"));
    assert_eq!(doc.value(&string_id("save")), Some("Guardar"));
    assert_eq!(doc.value(&string_id("delete")), Some("Borrar"));
    assert_eq!(outcome.origin(&string_id("title")), Some("en"));
    assert_eq!(outcome.origin(&string_id("save")), Some("es"));
    assert_eq!(outcome.origin(&string_id("delete")), Some("es"));
}

#[test]
fn test_merge_withFixedEntry_shouldNeverOverrideIt() {
    let outcome = LocaleMerger::merge(&sources(), &order(&["en", "es"])).unwrap();
    assert_eq!(outcome.document.value(&string_id("app_name")), Some("Droid Notes"));
    assert_eq!(outcome.origin(&string_id("app_name")), Some("en"));
    assert!(outcome.conflicts.iter().all(|c| c.id != string_id("app_name")));
}

#[test]
fn test_merge_withDifferentPluralForms_shouldReplaceWholesale() {
    let outcome = LocaleMerger::merge(&sources(), &order(&["en", "es"])).unwrap();

    assert_eq!(outcome.document.value(&plural_id("many")), Some("%d notas"));
    assert_eq!(outcome.document.value(&plural_id("one")), Some("%d nota"));

    let plural_notes: Vec<_> = outcome
        .conflicts
        .iter()
        .filter(|c| c.id.name() == "notes")
        .collect();
    assert_eq!(plural_notes.len(), 3);
    let many = plural_notes.iter().find(|c| c.id == plural_id("many")).unwrap();
    assert_eq!(many.previous, None);
    assert_eq!(many.chosen.as_deref(), Some("%d notas"));
    assert_eq!(many.winning_locale, "es");
}

#[test]
fn test_merge_withReversedPrecedence_shouldLetBaseWin() {
    let outcome = LocaleMerger::merge(&sources(), &order(&["es", "en"])).unwrap();

    assert_eq!(outcome.document.value(&string_id("save")), Some("Save"));
    assert_eq!(outcome.document.value(&string_id("delete")), Some("Borrar"));
    assert_eq!(outcome.origin(&string_id("title")), Some("en"));

    let save = outcome.conflicts.iter().find(|c| c.id == string_id("save")).unwrap();
    assert_eq!(save.previous_locale, "es");
    assert_eq!(save.previous.as_deref(), Some("Guardar"));
    assert_eq!(save.chosen.as_deref(), Some("Save"));
}

#[test]
fn test_merge_withAppendedEntry_shouldLandBeforeClosingTag() {
    let outcome = LocaleMerger::merge(&sources(), &order(&["en", "es"])).unwrap();
    let out = String::from_utf8(outcome.document.serialize()).unwrap();

    let delete = out.find(r#"<string name="delete">Borrar</string>"#).unwrap();
    let close = out.find("</resources>").unwrap();
    assert!(delete < close);
    assert!(out.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
    assert!(ResourceDocument::parse(out.as_bytes()).is_ok());
}

#[test]
fn test_merge_withBadPrecedence_shouldFail() {
    assert_eq!(LocaleMerger::merge(&[], &order(&["en"])).unwrap_err(), MergeError::NoSources);
    assert_eq!(
        LocaleMerger::merge(&sources(), &order(&["en"])).unwrap_err(),
        MergeError::Unranked("es".to_string())
    );
    assert_eq!(
        LocaleMerger::merge(&sources(), &order(&["en", "es", "fr"])).unwrap_err(),
        MergeError::UnknownLocale("fr".to_string())
    );
}
