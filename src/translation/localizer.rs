/*!
 * Whole-document localization.
 *
 * Runs protect, dispatch, escape and restore for one document and many target
 * languages, and assembles one translated document per language as soon as the
 * language's last job reports.
 */

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::cache::TranslationCache;
use super::chain::ProviderChain;
use super::dispatcher::{LanguageResults, TranslationDispatcher};
use super::mask::{PlaceholderMask, ProtectedSpan, Segment, split_sentinels};
use super::unit::TranslationUnit;
use crate::errors::{FatalBatchError, TranslationError};
use crate::providers::TranslateOptions;
use crate::resources::escape::{EscapeContext, escape_fragment, is_quoted};
use crate::resources::{ResourceDocument, UnitId};

/// What to do with a unit that could not be translated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep the source text and carry on
    #[default]
    SourceText,
    /// Keep the source text and flag the language as incomplete
    MarkIncomplete,
}

/// A unit that kept its source text
#[derive(Debug)]
pub struct UnitFailure {
    pub id: UnitId,
    pub error: TranslationError,
}

/// Translated leaves of one language, by resource kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationCounts {
    pub strings: usize,
    pub arrays: usize,
    pub array_items: usize,
    pub plurals: usize,
    pub plural_items: usize,
}

impl TranslationCounts {
    pub fn from_ids<'a>(ids: impl IntoIterator<Item = &'a UnitId>) -> Self {
        let mut counts = Self::default();
        let mut arrays = HashSet::new();
        let mut plurals = HashSet::new();
        for id in ids {
            match id {
                UnitId::String { .. } => counts.strings += 1,
                UnitId::ArrayItem { name, .. } => {
                    counts.array_items += 1;
                    arrays.insert(name.as_str());
                }
                UnitId::PluralItem { name, .. } => {
                    counts.plural_items += 1;
                    plurals.insert(name.as_str());
                }
            }
        }
        counts.arrays = arrays.len();
        counts.plurals = plurals.len();
        counts
    }
}

impl fmt::Display for TranslationCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} strings, {} arrays ({} items), {} plurals ({} items)",
            self.strings, self.arrays, self.array_items, self.plurals, self.plural_items
        )
    }
}

/// Result for one target language
#[derive(Debug)]
pub struct LocalizedDocument {
    pub language: String,
    /// Source document with every successful translation applied
    pub document: ResourceDocument,
    /// Number of leaves that received new text
    pub translated: usize,
    /// `translated`, split by resource kind
    pub counts: TranslationCounts,
    pub failures: Vec<UnitFailure>,
    /// Set when the language was abandoned
    pub fatal: Option<FatalBatchError>,
    /// Whether failures make the document unusable under the active policy
    pub incomplete: bool,
}

impl LocalizedDocument {
    /// Whether the document should be written out
    pub fn is_usable(&self) -> bool {
        self.fatal.is_none() && !self.incomplete
    }
}

/// Summary over all requested languages
#[derive(Debug, Default)]
pub struct LocalizationReport {
    pub documents: Vec<LocalizedDocument>,
}

impl LocalizationReport {
    /// Languages that produced no usable document
    pub fn failed_languages(&self) -> Vec<&str> {
        self.documents
            .iter()
            .filter(|d| !d.is_usable())
            .map(|d| d.language.as_str())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.documents.iter().all(LocalizedDocument::is_usable)
    }

    pub fn document(&self, language: &str) -> Option<&LocalizedDocument> {
        self.documents.iter().find(|d| d.language == language)
    }
}

/// Translates whole resource documents
#[derive(Debug, Clone)]
pub struct Localizer {
    dispatcher: TranslationDispatcher,
    mask: PlaceholderMask,
    concurrency: usize,
    policy: FailurePolicy,
}

impl Localizer {
    pub fn new(chain: Arc<ProviderChain>, mask: PlaceholderMask, concurrency: usize) -> Self {
        Self {
            dispatcher: TranslationDispatcher::new(chain),
            mask,
            concurrency,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_options(mut self, options: TranslateOptions) -> Self {
        self.dispatcher = self.dispatcher.with_options(options);
        self
    }

    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.dispatcher = self.dispatcher.with_cache(cache);
        self
    }

    pub fn dispatcher(&self) -> &TranslationDispatcher {
        &self.dispatcher
    }

    /// Protect the translatable units of `document`
    ///
    /// `origins` overrides the source language per leaf, as produced by a merge.
    pub fn prepare_units(
        &self,
        document: &ResourceDocument,
        source_lang: &str,
        origins: Option<&HashMap<UnitId, String>>,
    ) -> Vec<TranslationUnit> {
        document
            .translatable_units(source_lang)
            .into_iter()
            .map(|mut unit| {
                if let Some(origin) = origins.and_then(|o| o.get(&unit.id)) {
                    unit.source_lang = origin.clone();
                }
                unit.protect(&self.mask)
            })
            .collect()
    }

    /// Translate `document` into every target language
    pub async fn localize(
        &self,
        document: &ResourceDocument,
        source_lang: &str,
        target_langs: &[String],
    ) -> LocalizationReport {
        self.localize_with(document, source_lang, None, target_langs, |_| {}, |_, _| {})
            .await
    }

    /// Like [`localize`](Self::localize), handing each document to `on_document`
    /// as soon as its language completes
    pub async fn localize_with<D, P>(
        &self,
        document: &ResourceDocument,
        source_lang: &str,
        origins: Option<&HashMap<UnitId, String>>,
        target_langs: &[String],
        on_document: D,
        on_progress: P,
    ) -> LocalizationReport
    where
        D: Fn(&LocalizedDocument) + Sync,
        P: Fn(usize, usize) + Sync,
    {
        let units = self.prepare_units(document, source_lang, origins);
        info!(
            "Localizing {} units into {} languages",
            units.len(),
            target_langs.len()
        );

        let assembled = parking_lot::Mutex::new(Vec::with_capacity(target_langs.len()));
        self.dispatcher
            .translate_all_with(
                &units,
                target_langs,
                self.concurrency,
                |results| {
                    let localized = self.assemble(document, &units, results);
                    on_document(&localized);
                    assembled.lock().push(localized);
                },
                on_progress,
            )
            .await;

        let mut documents = assembled.into_inner();
        documents.sort_by_key(|d| target_langs.iter().position(|l| l == &d.language));
        LocalizationReport { documents }
    }

    /// Build the translated document for one language
    fn assemble(&self, document: &ResourceDocument, units: &[TranslationUnit], results: &LanguageResults) -> LocalizedDocument {
        let mut translations = HashMap::new();
        let mut failures = Vec::new();

        for unit in units {
            let Some(result) = results.results.get(&unit.id) else {
                continue;
            };
            if !result.succeeded {
                failures.push(UnitFailure {
                    id: unit.id.clone(),
                    error: TranslationError::Failed(
                        result.error.clone().unwrap_or_else(|| "no provider succeeded".to_string()),
                    ),
                });
                continue;
            }
            if result.text == unit.masked_text {
                continue;
            }
            let escaped = escape_output(&result.text, &unit.spans, is_quoted(&unit.source_text));
            match unit.restore(&self.mask, &escaped) {
                Ok(text) => {
                    translations.insert(unit.id.clone(), text);
                }
                Err(e) => {
                    warn!("{} for {}: {}, keeping source text", unit.id, results.language, e);
                    failures.push(UnitFailure {
                        id: unit.id.clone(),
                        error: TranslationError::Restore(e),
                    });
                }
            }
        }

        let incomplete = self.policy == FailurePolicy::MarkIncomplete && !failures.is_empty();
        if !failures.is_empty() {
            warn!(
                "{} of {} units kept their source text for {}",
                failures.len(),
                units.len(),
                results.language
            );
        }

        LocalizedDocument {
            language: results.language.clone(),
            translated: translations.len(),
            counts: TranslationCounts::from_ids(translations.keys()),
            document: document.apply_translations(&translations),
            failures,
            fatal: results.fatal.clone(),
            incomplete,
        }
    }
}

/// Escape masked provider output for storage as raw resource text
///
/// Sentinels are copied through. Text inside a CDATA section is copied as is.
/// When the source was a double-quoted string and the output kept the quotes,
/// the quotes stay unescaped and apostrophes inside them stay literal.
fn escape_output(text: &str, spans: &[ProtectedSpan], quoted_source: bool) -> String {
    let (open, body, close) = match text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        Some(inner) if quoted_source => ("\"", inner, "\""),
        _ => ("", text, ""),
    };

    let mut out = String::with_capacity(text.len() + 8);
    out.push_str(open);
    let mut in_cdata = false;
    for segment in split_sentinels(body, spans) {
        match segment {
            Segment::Text(run) if in_cdata => out.push_str(run),
            Segment::Text(run) => {
                let context = EscapeContext {
                    at_start: out.is_empty(),
                    quoted: !open.is_empty(),
                };
                out.push_str(&escape_fragment(run, context));
            }
            Segment::Sentinel { token, index } => {
                out.push_str(token);
                if let Some(span) = index.and_then(|i| spans.get(i)).filter(|span| span.sentinel == token) {
                    in_cdata = span.leaves_cdata_open(in_cdata);
                }
            }
        }
    }
    out.push_str(close);
    out
}
