/*!
 * Translation pipeline for resource documents.
 *
 * This module turns resource leaves into provider requests and back. It is
 * split into several submodules:
 *
 * - `unit`: the unit of work and its protected spans
 * - `mask`: placeholder protection and restoration
 * - `chain`: ordered provider fallback with retry and backoff
 * - `dispatcher`: bounded worker pool over `(unit, language)` jobs
 * - `localizer`: whole-document orchestration per target language
 * - `cache`: de-duplication of identical requests within a run
 * - `concurrency`: per-provider in-flight limits
 */

pub use self::cache::TranslationCache;
pub use self::chain::{ProviderChain, ProviderResult, RetryPolicy};
pub use self::dispatcher::{DispatchReport, LanguageResults, TranslationDispatcher};
pub use self::localizer::{
    FailurePolicy, LocalizationReport, LocalizedDocument, Localizer, TranslationCounts, UnitFailure,
};
pub use self::mask::{
    MaskedText, PlaceholderMask, ProtectedSpan, Segment, SpanKind, has_translatable_text, split_sentinels,
};
pub use self::unit::TranslationUnit;

pub mod cache;
pub mod chain;
pub mod concurrency;
pub mod dispatcher;
pub mod localizer;
pub mod mask;
pub mod unit;
