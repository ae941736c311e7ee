use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for locale code handling
///
/// This module validates BCP 47 style locale tags (`fr`, `pt-BR`, `zh-Hans`),
/// and maps them to and from Android `values-*` resource qualifiers.
/// Source language that lets the provider detect the language itself
pub const AUTO_DETECT: &str = "auto";

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Kind of subtag following the primary language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subtag {
    /// Four letter script, e.g. `Hans`
    Script,
    /// Two letter or three digit region, e.g. `BR`
    Region,
}

/// Parsed locale tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleTag {
    pub language: String,
    pub script: Option<String>,
    pub region: Option<String>,
}

impl LocaleTag {
    /// Parse `ll`, `ll-RR`, `ll-Ssss` or `ll-Ssss-RR`
    ///
    /// Underscores are accepted as separators. Case is normalized.
    pub fn parse(code: &str) -> Result<Self> {
        let mut parts = code.trim().split(['-', '_']);
        let language = parts.next().unwrap_or_default().to_lowercase();
        normalize_to_part2t(&language)?;

        let mut tag = Self {
            language,
            script: None,
            region: None,
        };

        for part in parts {
            match classify_subtag(part) {
                Some(Subtag::Script) if tag.script.is_none() && tag.region.is_none() => {
                    let mut chars = part.chars();
                    let first = chars.next().map(|c| c.to_ascii_uppercase()).unwrap_or_default();
                    tag.script = Some(format!("{}{}", first, chars.as_str().to_lowercase()));
                }
                Some(Subtag::Region) if tag.region.is_none() => {
                    tag.region = Some(part.to_uppercase());
                }
                _ => return Err(anyhow!("Invalid locale code: {}", code)),
            }
        }

        Ok(tag)
    }

    /// Canonical BCP 47 form
    pub fn to_code(&self) -> String {
        let mut code = self.language.clone();
        for part in [&self.script, &self.region].into_iter().flatten() {
            code.push('-');
            code.push_str(part);
        }
        code
    }
}

fn classify_subtag(part: &str) -> Option<Subtag> {
    if part.len() == 4 && part.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(Subtag::Script)
    } else if (part.len() == 2 && part.chars().all(|c| c.is_ascii_alphabetic()))
        || (part.len() == 3 && part.chars().all(|c| c.is_ascii_digit()))
    {
        Some(Subtag::Region)
    } else {
        None
    }
}

/// Validate a locale code; `auto` is accepted only when `allow_auto` is set
pub fn validate_language_code(code: &str, allow_auto: bool) -> Result<()> {
    if code.trim().eq_ignore_ascii_case(AUTO_DETECT) {
        return if allow_auto {
            Ok(())
        } else {
            Err(anyhow!("'{}' is only valid as a source language", AUTO_DETECT))
        };
    }
    LocaleTag::parse(code).map(|_| ())
}

/// Normalize a primary language subtag to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => {
            if let Some(lang) = Language::from_639_1(&normalized_code) {
                return Ok(lang.to_639_3().to_string());
            }
        }
        3 => {
            if Language::from_639_3(&normalized_code).is_some() {
                return Ok(normalized_code);
            }
            if let Some((_, part2t)) = PART2B_TO_PART2T.iter().find(|(b, _)| *b == normalized_code) {
                return Ok(part2t.to_string());
            }
        }
        _ => {}
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Check if two locale codes share the same primary language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    let primary = |code: &str| {
        LocaleTag::parse(code)
            .ok()
            .and_then(|tag| normalize_to_part2t(&tag.language).ok())
    };
    match (primary(code1), primary(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name from a locale code
pub fn get_language_name(code: &str) -> Result<String> {
    let tag = LocaleTag::parse(code)?;
    let normalized = normalize_to_part2t(&tag.language)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Android resource directory for a locale
///
/// `fr` → `values-fr`, `pt-BR` → `values-pt-rBR`, `zh-Hans` → `values-b+zh+Hans`.
pub fn values_dir_for(code: &str) -> Result<String> {
    let tag = LocaleTag::parse(code)?;
    Ok(match (&tag.script, &tag.region) {
        (None, None) => format!("values-{}", tag.language),
        (None, Some(region)) if region.len() == 2 => format!("values-{}-r{}", tag.language, region),
        _ => format!("values-b+{}", tag.to_code().replace('-', "+")),
    })
}

/// Locale code for an Android `values-*` directory name
///
/// Returns `None` for the default `values` directory and for qualifiers that are
/// not locales (`values-night`, `values-v21`, `values-land`).
pub fn locale_from_values_dir(dir_name: &str) -> Option<String> {
    let qualifier = dir_name.strip_prefix("values-")?;

    let candidate = if let Some(bcp) = qualifier.strip_prefix("b+") {
        bcp.replace('+', "-")
    } else {
        let mut parts = qualifier.split('-');
        let language = parts.next()?;
        match parts.next() {
            None => language.to_string(),
            Some(region) => {
                let region = region.strip_prefix('r')?;
                if parts.next().is_some() {
                    return None;
                }
                format!("{}-{}", language, region)
            }
        }
    };

    let tag = LocaleTag::parse(&candidate).ok()?;
    // `values-car` is the car UI mode, not Carib
    if tag.language.len() != 2 && tag.script.is_none() && tag.region.is_none() {
        return None;
    }
    Some(tag.to_code())
}

/// Drop repeated locale codes, keeping the first spelling of each locale
///
/// Codes that do not parse are compared as written.
pub fn dedup_locale_codes(codes: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    codes
        .into_iter()
        .filter(|code| {
            let key = LocaleTag::parse(code).map(|tag| tag.to_code()).unwrap_or_else(|_| code.clone());
            let first = seen.insert(key);
            if !first {
                log::warn!("Target language {} is listed more than once, translating it once", code);
            }
            first
        })
        .collect()
}
