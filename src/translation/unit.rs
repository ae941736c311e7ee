/*!
 * The unit of work sent through the provider chain.
 */

use crate::errors::RestoreError;
use crate::resources::UnitId;

use super::mask::{PlaceholderMask, ProtectedSpan, has_translatable_text};

/// One leaf of a resource document on its way to a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationUnit {
    /// Leaf address
    pub id: UnitId,
    /// Raw resource text of the leaf
    pub source_text: String,
    /// Text with protected spans replaced by sentinels
    pub masked_text: String,
    /// Spans hidden in `masked_text`
    pub spans: Vec<ProtectedSpan>,
    /// Set once the unit is paired with a target language
    pub target_lang: Option<String>,
    /// Language of `source_text`, or `auto`
    pub source_lang: String,
}

impl TranslationUnit {
    /// Unprotected unit; `masked_text` starts as a copy of the source
    pub fn new(id: UnitId, source_text: impl Into<String>, source_lang: impl Into<String>) -> Self {
        let source_text = source_text.into();
        Self {
            id,
            masked_text: source_text.clone(),
            source_text,
            spans: Vec::new(),
            target_lang: None,
            source_lang: source_lang.into(),
        }
    }

    /// Mask protected spans of the source text
    pub fn protect(mut self, mask: &PlaceholderMask) -> Self {
        let masked = mask.protect(&self.source_text);
        self.masked_text = masked.masked;
        self.spans = masked.spans;
        self
    }

    /// Copy bound to a target language
    pub fn for_target(&self, target_lang: &str) -> Self {
        Self {
            target_lang: Some(target_lang.to_string()),
            ..self.clone()
        }
    }

    /// Whether a provider has anything to translate
    pub fn needs_provider(&self) -> bool {
        has_translatable_text(&self.masked_text)
    }

    /// Swap sentinels in translated text back for the protected spans
    pub fn restore(&self, mask: &PlaceholderMask, translated_masked: &str) -> Result<String, RestoreError> {
        mask.restore(translated_masked, &self.spans)
    }
}
