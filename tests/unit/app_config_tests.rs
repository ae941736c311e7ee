/*!
 * Tests for application configuration loading and validation
 */

use anyhow::Result;
use std::collections::HashMap;

use droidlingo::app_config::{Config, LogLevel, ProviderConfig, ProviderKind, TextType};
use droidlingo::errors::ConfigError;
use crate::common;

fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name| map.get(name).cloned()
}

#[test]
fn test_from_file_withProviderChain_shouldKeepOrderAndDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "target_languages": ["fr", "pt-BR"],
            "translation": {
                "providers": [
                    { "type": "libretranslate", "endpoint": "http://localhost:5000", "concurrent_requests": 2 },
                    { "type": "google" }
                ],
                "common": { "concurrency": 6 }
            },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::from_file(&path)?;
    assert_eq!(config.source_language, "auto");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.translation.common.concurrency, 6);
    assert_eq!(config.translation.common.timeout_secs, 30);

    let kinds: Vec<_> = config.translation.chain().iter().map(|p| p.provider_type).collect();
    assert_eq!(kinds, vec![ProviderKind::LibreTranslate, ProviderKind::Google]);
    assert_eq!(config.translation.providers[0].concurrent_requests, Some(2));
    assert_eq!(
        config.translation.providers[1].effective_endpoint(),
        "https://translate.googleapis.com"
    );
    assert!(config.validate().is_ok());
    Ok(())
}

#[test]
fn test_from_file_withMissingOrBrokenFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    assert!(Config::from_file(temp_dir.path().join("absent.json")).is_err());

    let broken = common::create_test_file(temp_dir.path(), "broken.json", "{ \"target_languages\": [")?;
    let err = Config::from_file(&broken).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
    Ok(())
}

#[test]
fn test_env_overrides_withAzureFromFile_shouldOverlayOnlySetValues() -> Result<()> {
    let mut config = common::test_config("en", &["de"]);
    let mut azure = ProviderConfig::new(ProviderKind::Azure);
    azure.api_key = "from-file".to_string();
    azure.region = "northeurope".to_string();
    config.translation.providers = vec![ProviderConfig::new(ProviderKind::Google), azure];

    config.apply_env_overrides_with(env(&[
        ("AZURE_TRANSLATOR_REGION", "westeurope"),
        ("AZURE_TRANSLATOR_CATEGORY", "   "),
    ]))?;

    let azure = config.translation.get_provider_config(ProviderKind::Azure).unwrap();
    assert_eq!(azure.api_key, "from-file");
    assert_eq!(azure.region, "westeurope");
    assert_eq!(azure.category, "");
    // An existing Azure link keeps its position
    assert_eq!(config.translation.providers[0].provider_type, ProviderKind::Google);
    Ok(())
}

#[test]
fn test_validate_withBadEndpointOrPattern_shouldReportField() {
    let mut config = common::test_config("en", &["de"]);
    let mut libre = ProviderConfig::new(ProviderKind::LibreTranslate);
    libre.endpoint = "not a url".to_string();
    config.translation.providers = vec![libre];
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid { field, .. }) if field == "endpoint"
    ));

    let mut config = common::test_config("en", &["de"]);
    config.protection.patterns.push("[unclosed".to_string());
    assert!(config.validate().is_err());

    let mut config = common::test_config("en", &["de"]);
    config.translation.providers = vec![ProviderConfig {
        concurrent_requests: Some(0),
        ..ProviderConfig::new(ProviderKind::Google)
    }];
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withTransliterationAndAzure_shouldCheckScript() {
    let mut config = common::test_config("sr", &["sr"]);
    config.translation.common.transliterate = true;
    config.apply_env_overrides_with(env(&[("AZURE_TRANSLATOR_KEY", "secret")])).unwrap();
    assert!(config.validate().is_ok());

    config.translation.common.to_script = "Latin".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid { field, .. }) if field == "to_script"
    ));
}

#[test]
fn test_validate_withTransliterationOnKeylessChain_shouldPass() {
    let mut config = common::test_config("en", &["sr"]);
    config.translation.common.transliterate = true;
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withDuplicateTargets_shouldFail() {
    let config = common::test_config("en", &["fr", "de", "fr"]);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid { field, .. }) if field == "target_languages"
    ));

    let config = common::test_config("en", &["zh-Hant", "zh_hant"]);
    assert!(config.validate().is_err());
}

#[test]
fn test_from_str_withCliSpellings_shouldParse() {
    assert_eq!("Azure".parse::<ProviderKind>().unwrap(), ProviderKind::Azure);
    assert_eq!("libre".parse::<ProviderKind>().unwrap(), ProviderKind::LibreTranslate);
    assert!("deepl".parse::<ProviderKind>().is_err());
    assert_eq!("text".parse::<TextType>().unwrap(), TextType::Plain);
    assert_eq!(TextType::Plain.as_libre_format(), "text");
    assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
}
