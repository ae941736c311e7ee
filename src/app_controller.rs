use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::providers::TranslateOptions;
use crate::providers::http::build_client;
use crate::resources::{LocaleMerger, LocaleSource};
use crate::translation::{
    LocalizationReport, LocalizedDocument, Localizer, PlaceholderMask, ProviderChain, TranslationCache,
    TranslationCounts,
};

// @module: Application controller for resource localization

/// Where translated documents are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// `strings-<lang>.xml` beside the input
    Beside,
    /// Overwrite the input file; needs exactly one target language
    InPlace,
    /// `values-<qualifier>/strings.xml` under a resource directory
    ValuesDir(PathBuf),
}

/// Outcome of one workflow run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Language and path of every document written
    pub written: Vec<(String, PathBuf)>,
    /// Translated leaves per written language, by resource kind
    pub counts: Vec<(String, TranslationCounts)>,
    /// Languages that produced no usable document
    pub failed_languages: Vec<String>,
    /// Units that kept their source text, over all languages
    pub failed_units: usize,
    /// Merge conflicts resolved by precedence
    pub conflicts: usize,
    pub duration: Duration,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed_languages.is_empty()
    }
}

/// Main application controller for resource translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    chain: Arc<ProviderChain>,
    mask: PlaceholderMask,
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        let common = &config.translation.common;
        let client = build_client(common.timeout_secs, common.pool_max_size)?;
        let chain = ProviderChain::from_config(&config, client)?;
        Self::from_parts(config, Arc::new(chain))
    }

    /// Create a controller around an already-built provider chain
    pub fn with_chain(config: Config, chain: Arc<ProviderChain>) -> Result<Self> {
        config.validate()?;
        Self::from_parts(config, chain)
    }

    fn from_parts(config: Config, chain: Arc<ProviderChain>) -> Result<Self> {
        let mask = config.protection.mask()?;
        if !chain.has_usable_provider() {
            return Err(anyhow!("No translation provider configured"));
        }
        if config.translation.common.transliterate && !chain.can_transliterate() {
            warn!("No provider in the chain supports transliteration, plain translations will be written");
        }
        info!("Provider chain: {}", chain.provider_names().join(" -> "));

        Ok(Self {
            config,
            chain,
            mask,
            show_progress: true,
        })
    }

    /// Hide progress bars
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Translate one resource file into every target language
    pub async fn translate_file(&self, input_file: &Path, mode: OutputMode) -> Result<RunSummary> {
        let start_time = Instant::now();

        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }
        if mode == OutputMode::InPlace && self.config.target_languages.len() != 1 {
            return Err(anyhow!(
                "In-place output needs exactly one target language, got {}",
                self.config.target_languages.len()
            ));
        }

        let document = FileManager::read_document(input_file)?;
        info!(
            "Loaded {} entries from {}",
            document.entries().len(),
            input_file.display()
        );

        let localizer = self.localizer();
        let written = Mutex::new(Vec::new());
        let progress = self.progress_bar("units");
        let report = localizer
            .localize_with(
                &document,
                &self.config.source_language,
                None,
                &self.config.target_languages,
                |localized| self.write_localized(localized, input_file, &mode, &written),
                |done, total| {
                    progress.set_length(total as u64);
                    progress.set_position(done as u64);
                },
            )
            .await;
        progress.finish_and_clear();

        Ok(self.summarize(&localizer, &report, written.into_inner(), 0, start_time.elapsed()))
    }

    /// Merge every locale under a resource directory and translate the result
    ///
    /// The default `values` directory is the lowest source and is tagged with the
    /// configured source language. Other locales follow in directory order unless
    /// `precedence` ranks them explicitly.
    pub async fn merge_resources(&self, res_dir: &Path, precedence: Option<&[String]>) -> Result<RunSummary> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(res_dir) {
            return Err(anyhow!("Resource directory does not exist: {:?}", res_dir));
        }
        let found = FileManager::find_locale_resources(res_dir)?;
        if found.is_empty() {
            return Err(anyhow!("No values*/strings.xml found under {}", res_dir.display()));
        }

        let mut sources: Vec<LocaleSource> = Vec::with_capacity(found.len());
        for resource in found {
            let locale = resource
                .locale
                .clone()
                .unwrap_or_else(|| self.config.source_language.clone());
            if sources.iter().any(|s| s.locale == locale) {
                warn!("Skipping {}: locale '{}' already loaded", resource.path.display(), locale);
                continue;
            }
            let document = FileManager::read_document(&resource.path)?;
            debug!("Loaded locale '{}' from {}", locale, resource.path.display());
            sources.push(LocaleSource::new(locale, document));
        }

        let order: Vec<String> = match precedence {
            Some(order) => order.to_vec(),
            None => sources.iter().map(|s| s.locale.clone()).collect(),
        };
        let outcome = LocaleMerger::merge(&sources, &order).context("Failed to merge locale resources")?;
        for note in &outcome.conflicts {
            debug!(
                "{}: '{}' overrides '{}'",
                note.id, note.winning_locale, note.previous_locale
            );
        }

        let localizer = self.localizer();
        let mode = OutputMode::ValuesDir(res_dir.to_path_buf());
        let written = Mutex::new(Vec::new());
        let progress = self.progress_bar("units");
        let report = localizer
            .localize_with(
                &outcome.document,
                &self.config.source_language,
                Some(&outcome.origins),
                &self.config.target_languages,
                |localized| self.write_localized(localized, res_dir, &mode, &written),
                |done, total| {
                    progress.set_length(total as u64);
                    progress.set_position(done as u64);
                },
            )
            .await;
        progress.finish_and_clear();

        Ok(self.summarize(
            &localizer,
            &report,
            written.into_inner(),
            outcome.conflicts.len(),
            start_time.elapsed(),
        ))
    }

    fn localizer(&self) -> Localizer {
        let common = &self.config.translation.common;
        let localizer = Localizer::new(self.chain.clone(), self.mask.clone(), common.concurrency)
            .with_policy(common.failure_policy)
            .with_cache(TranslationCache::new(common.cache));
        if common.transliterate {
            localizer.with_options(TranslateOptions::transliterate(common.to_script.clone()))
        } else {
            localizer
        }
    }

    fn output_path(&self, language: &str, input: &Path, mode: &OutputMode) -> Result<PathBuf> {
        match mode {
            OutputMode::Beside => Ok(FileManager::output_path_beside(
                input,
                language,
                self.config.translation.common.transliterate,
            )),
            OutputMode::InPlace => Ok(input.to_path_buf()),
            OutputMode::ValuesDir(res_dir) => FileManager::values_output_path(res_dir, language),
        }
    }

    /// Write one finished language; called as soon as the language completes
    fn write_localized(
        &self,
        localized: &LocalizedDocument,
        input: &Path,
        mode: &OutputMode,
        written: &Mutex<Vec<(String, PathBuf)>>,
    ) {
        if !localized.is_usable() {
            error!("Not writing {}: no usable document", localized.language);
            return;
        }

        let result = self
            .output_path(&localized.language, input, mode)
            .and_then(|path| FileManager::write_atomic(&path, &localized.document.serialize()).map(|_| path));
        match result {
            Ok(path) => {
                info!(
                    "Success: {} ({}) -> {}",
                    localized.language,
                    localized.counts,
                    path.display()
                );
                written.lock().push((localized.language.clone(), path));
            }
            Err(e) => error!("Failed to write {}: {:#}", localized.language, e),
        }
    }

    fn progress_bar(&self, unit_label: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress_bar = ProgressBar::new(0);
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{eta}}",
            unit_label
        );
        let style = ProgressStyle::default_bar()
            .template(&template)
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }

    fn summarize(
        &self,
        localizer: &Localizer,
        report: &LocalizationReport,
        mut written: Vec<(String, PathBuf)>,
        conflicts: usize,
        duration: Duration,
    ) -> RunSummary {
        let mut failed_languages = Vec::new();
        let mut failed_units = 0;

        for document in &report.documents {
            failed_units += document.failures.len();
            for failure in &document.failures {
                warn!("{} [{}]: {}", failure.id, document.language, failure.error);
            }
            if let Some(fatal) = &document.fatal {
                error!("{}", fatal);
            } else if document.incomplete {
                error!("{}: {} units failed, marked incomplete", document.language, document.failures.len());
            }
        }
        for language in &self.config.target_languages {
            let usable = written.iter().any(|(lang, _)| lang == language);
            if !usable {
                failed_languages.push(language.clone());
            }
        }

        let (hits, misses, _) = localizer.dispatcher().cache().stats();
        debug!("Translation cache: {} hits, {} misses", hits, misses);

        written.sort_by_key(|(lang, _)| self.config.target_languages.iter().position(|l| l == lang));
        let counts: Vec<(String, TranslationCounts)> = written
            .iter()
            .filter_map(|(lang, _)| report.document(lang).map(|d| (lang.clone(), d.counts)))
            .collect();
        for (language, language_counts) in &counts {
            info!("- {}: {}", language, language_counts);
        }
        info!(
            "Done in {}: {} of {} languages written, {} units kept source text{}",
            Self::format_duration(duration),
            written.len(),
            self.config.target_languages.len(),
            failed_units,
            if conflicts > 0 {
                format!(", {} merge conflicts", conflicts)
            } else {
                String::new()
            }
        );
        if !failed_languages.is_empty() {
            error!("Failed languages: {}", failed_languages.join(", "));
        }

        RunSummary {
            written,
            counts,
            failed_languages,
            failed_units,
            conflicts,
            duration,
        }
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
