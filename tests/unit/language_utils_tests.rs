/*!
 * Tests for locale code utilities
 */

use droidlingo::language_utils::{
    LocaleTag, dedup_locale_codes, get_language_name, language_codes_match, locale_from_values_dir, normalize_to_part2t,
    validate_language_code, values_dir_for,
};

#[test]
fn test_locale_tag_withMixedCaseAndUnderscores_shouldNormalize() {
    let tag = LocaleTag::parse("ZH_hant_tw").unwrap();
    assert_eq!(tag.language, "zh");
    assert_eq!(tag.script.as_deref(), Some("Hant"));
    assert_eq!(tag.region.as_deref(), Some("TW"));
    assert_eq!(tag.to_code(), "zh-Hant-TW");
}

#[test]
fn test_locale_tag_withMisplacedSubtags_shouldFail() {
    assert!(LocaleTag::parse("pt-BR-Latn").is_err());
    assert!(LocaleTag::parse("pt-BR-PT").is_err());
    assert!(LocaleTag::parse("").is_err());
}

#[test]
fn test_normalize_to_part2t_withVariousForms_shouldReturnThreeLetterCode() {
    assert_eq!(normalize_to_part2t("fr").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("ger").unwrap(), "deu");
    assert_eq!(normalize_to_part2t(" SRP ").unwrap(), "srp");
    assert!(normalize_to_part2t("zz").is_err());
}

#[test]
fn test_values_dir_round_trip_withCommonLocales_shouldAgree() {
    for code in ["fr", "pt-BR", "zh-Hans", "sr-Latn", "es-419", "zh-Hant-TW"] {
        let dir = values_dir_for(code).unwrap();
        assert_eq!(locale_from_values_dir(&dir).as_deref(), Some(code), "via {}", dir);
    }
}

#[test]
fn test_locale_from_values_dir_withCombinedQualifiers_shouldSkip() {
    assert_eq!(locale_from_values_dir("values-en-rUS-night"), None);
    assert_eq!(locale_from_values_dir("values-sw600dp"), None);
    assert_eq!(locale_from_values_dir("layout-fr"), None);
    assert_eq!(locale_from_values_dir("values-b+sr+Latn"), Some("sr-Latn".to_string()));
}

#[test]
fn test_language_helpers_withRegionalCodes_shouldUsePrimaryLanguage() {
    assert!(language_codes_match("pt-BR", "pt-PT"));
    assert!(language_codes_match("zh-Hans", "chi"));
    assert!(!language_codes_match("auto", "en"));
    assert_eq!(get_language_name("pt-BR").unwrap(), "Portuguese");
    assert!(validate_language_code("AUTO", true).is_ok());
    assert!(validate_language_code("en-", false).is_err());
}

#[test]
fn test_dedup_locale_codes_withRepeatedLocales_shouldKeepFirstSpelling() {
    let codes = ["fr", "pt-BR", "FR", "pt_br", "de", "xx", "xx"].map(String::from).to_vec();
    assert_eq!(dedup_locale_codes(codes), vec!["fr", "pt-BR", "de", "xx"]);
}
