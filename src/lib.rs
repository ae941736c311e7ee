/*!
 * # droidlingo - Android string resource translator
 *
 * A Rust library for translating Android `strings.xml` resources with machine
 * translation services.
 *
 * ## Features
 *
 * - Lossless parsing and serialization of resource files (comments, whitespace,
 *   attribute quoting and BOM survive untouched)
 * - Protection of format specifiers, escape sequences and configurable patterns
 * - Translation through an ordered provider chain:
 *   - Azure Translator (with transliteration)
 *   - Google web endpoint
 *   - LibreTranslate
 * - Retry with exponential backoff and provider fallback
 * - Bounded worker pool across many target languages
 * - Merging of several locale directories by precedence
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `resources`: resource document model, Android escaping and locale merge
 * - `translation`: the translation pipeline:
 *   - `translation::mask`: placeholder protection
 *   - `translation::chain`: provider fallback with retry
 *   - `translation::dispatcher`: worker pool over `(unit, language)` jobs
 *   - `translation::localizer`: whole-document localization
 *   - `translation::cache`: per-run translation cache
 * - `providers`: HTTP clients for the translation services
 * - `app_config`: Configuration management
 * - `app_controller`: File-level workflows
 * - `file_utils`: File system operations
 * - `language_utils`: Locale codes and Android resource qualifiers
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod resources;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, OutputMode, RunSummary};
pub use errors::{AppError, ConfigError, MergeError, ParseError, ProviderError, RestoreError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, values_dir_for};
pub use resources::{LocaleMerger, ResourceDocument, ResourceEntry, UnitId};
pub use translation::{Localizer, PlaceholderMask, ProviderChain, TranslationDispatcher};
