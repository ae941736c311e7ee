/*!
 * Fan-out of translation units across target languages.
 *
 * Every `(unit, language)` pair is translated once. Pairs are grouped into jobs
 * of consecutive units for one language, as many as the chain's largest batch
 * size allows (one unit per job for providers without a batch API). A fixed
 * number of worker futures pull jobs from a shared queue, so at most
 * `concurrency` jobs are in flight. Jobs are queued language by language, which
 * lets early languages finish first, but no ordering between jobs is guaranteed.
 *
 * A language is complete once all of its jobs have reported; the language
 * callback fires exactly once at that point. A fatal chain outcome raises the
 * language's cancellation flag, and its remaining jobs are recorded as cancelled
 * without reaching a provider.
 */

use std::collections::{HashMap, VecDeque};
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures::future::join_all;
use log::{debug, error, info};
use parking_lot::Mutex;

use super::cache::TranslationCache;
use super::chain::{ProviderChain, ProviderResult};
use super::unit::TranslationUnit;
use crate::errors::FatalBatchError;
use crate::providers::TranslateOptions;
use crate::resources::UnitId;

/// Everything reported for one language at its barrier
#[derive(Debug, Clone, Default)]
pub struct LanguageResults {
    /// Target language
    pub language: String,
    /// Result per unit
    pub results: HashMap<UnitId, ProviderResult>,
    /// Set when the language was abandoned
    pub fatal: Option<FatalBatchError>,
}

impl LanguageResults {
    /// Units whose translation did not succeed
    pub fn failed(&self) -> impl Iterator<Item = (&UnitId, &ProviderResult)> {
        self.results.iter().filter(|(_, r)| !r.succeeded)
    }
}

/// Results of a whole dispatch
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Result per `(unit, language)`
    pub results: HashMap<(UnitId, String), ProviderResult>,
    /// Languages that were abandoned
    pub fatal: HashMap<String, FatalBatchError>,
}

impl DispatchReport {
    /// Result of one job
    pub fn get(&self, id: &UnitId, language: &str) -> Option<&ProviderResult> {
        self.results.get(&(id.clone(), language.to_string()))
    }

    /// Number of jobs that did not succeed
    pub fn failure_count(&self) -> usize {
        self.results.values().filter(|r| !r.succeeded).count()
    }
}

/// Per-language bookkeeping guarded by one lock
#[derive(Default)]
struct LanguageState {
    remaining: usize,
    results: LanguageResults,
}

/// Runs translation jobs against a provider chain with bounded concurrency
#[derive(Debug, Clone)]
pub struct TranslationDispatcher {
    chain: Arc<ProviderChain>,
    cache: TranslationCache,
    options: TranslateOptions,
}

impl TranslationDispatcher {
    pub fn new(chain: Arc<ProviderChain>) -> Self {
        Self {
            chain,
            cache: TranslationCache::default(),
            options: TranslateOptions::default(),
        }
    }

    /// Use the given cache instead of a private one
    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.cache = cache;
        self
    }

    /// Request options sent with every job, e.g. a transliteration script
    pub fn with_options(mut self, options: TranslateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Translate every unit into every language
    pub async fn translate_all(
        &self,
        units: &[TranslationUnit],
        target_langs: &[String],
        concurrency: usize,
    ) -> DispatchReport {
        self.translate_all_with(units, target_langs, concurrency, |_| {}, |_, _| {})
            .await
    }

    /// Like [`translate_all`](Self::translate_all), with callbacks
    ///
    /// `on_language` runs once per language when its last job reports;
    /// `on_progress` receives `(done, total)` after every job.
    pub async fn translate_all_with<L, P>(
        &self,
        units: &[TranslationUnit],
        target_langs: &[String],
        concurrency: usize,
        on_language: L,
        on_progress: P,
    ) -> DispatchReport
    where
        L: Fn(&LanguageResults) + Sync,
        P: Fn(usize, usize) + Sync,
    {
        let total = units.len() * target_langs.len();
        let batch_size = self.chain.max_batch_size();
        let cancel_flags: Vec<AtomicBool> = target_langs.iter().map(|_| AtomicBool::new(false)).collect();
        let states: Vec<Mutex<LanguageState>> = target_langs
            .iter()
            .map(|lang| {
                Mutex::new(LanguageState {
                    remaining: units.len(),
                    results: LanguageResults {
                        language: lang.clone(),
                        ..LanguageResults::default()
                    },
                })
            })
            .collect();
        let queue: Mutex<VecDeque<(Range<usize>, usize)>> = Mutex::new(
            (0..target_langs.len())
                .flat_map(|lang| {
                    (0..units.len())
                        .step_by(batch_size)
                        .map(move |start| (start..(start + batch_size).min(units.len()), lang))
                })
                .collect(),
        );
        let done = AtomicUsize::new(0);

        info!(
            "Dispatching {} units to {} languages ({} jobs, {} workers)",
            units.len(),
            target_langs.len(),
            queue.lock().len(),
            concurrency.max(1)
        );

        // Languages without work are complete right away
        if units.is_empty() {
            for state in &states {
                on_language(&state.lock().results);
            }
        }

        let worker = |worker_id: usize| {
            let queue = &queue;
            let states = &states;
            let cancel_flags = &cancel_flags;
            let done = &done;
            let on_language = &on_language;
            let on_progress = &on_progress;
            async move {
                loop {
                    let Some((range, lang_idx)) = queue.lock().pop_front() else {
                        break;
                    };
                    let batch = &units[range];
                    let language = &target_langs[lang_idx];
                    let cancel = &cancel_flags[lang_idx];

                    let (results, fatal) = self.run_job(batch, language, cancel).await;
                    debug!("Worker {} finished {} unit(s) for {}", worker_id, batch.len(), language);

                    let completed = {
                        let mut state = states[lang_idx].lock();
                        state.results.results.extend(results);
                        if let Some(fatal) = fatal {
                            state.results.fatal.get_or_insert(fatal);
                        }
                        state.remaining -= batch.len();
                        (state.remaining == 0).then(|| state.results.clone())
                    };
                    if let Some(results) = completed {
                        info!(
                            "Language {} complete ({} units, {} failed)",
                            results.language,
                            results.results.len(),
                            results.failed().count()
                        );
                        on_language(&results);
                    }

                    let finished = done.fetch_add(batch.len(), Ordering::SeqCst) + batch.len();
                    on_progress(finished, total);
                }
            }
        };

        join_all((0..concurrency.max(1)).map(worker)).await;

        let mut report = DispatchReport::default();
        for state in states {
            let LanguageResults {
                language,
                results,
                fatal,
            } = state.into_inner().results;
            for (id, result) in results {
                report.results.insert((id, language.clone()), result);
            }
            if let Some(fatal) = fatal {
                report.fatal.insert(language, fatal);
            }
        }
        report
    }

    /// Translate one batch of units into `language`
    ///
    /// Units needing no provider are settled first. The rest go to the chain in
    /// one call per source language, with identical texts sent once. A fatal
    /// chain outcome raises `cancel` and is returned with the results.
    async fn run_job(
        &self,
        units: &[TranslationUnit],
        language: &str,
        cancel: &AtomicBool,
    ) -> (Vec<(UnitId, ProviderResult)>, Option<FatalBatchError>) {
        let jobs: Vec<TranslationUnit> = units.iter().map(|unit| unit.for_target(language)).collect();
        let mut results: Vec<Option<ProviderResult>> = jobs.iter().map(|job| self.settle(job, language, cancel)).collect();

        // Provider-bound units grouped by source language, in order
        let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
        for (i, job) in jobs.iter().enumerate().filter(|(i, _)| results[*i].is_none()) {
            match groups.iter_mut().find(|(lang, _)| *lang == job.source_lang) {
                Some((_, members)) => members.push(i),
                None => groups.push((job.source_lang.as_str(), vec![i])),
            }
        }

        let mut fatal = None;
        for (source_lang, members) in groups {
            let mut texts: Vec<&str> = Vec::new();
            let slots: Vec<usize> = members
                .iter()
                .map(|&i| {
                    let text = jobs[i].masked_text.as_str();
                    texts.iter().position(|t| *t == text).unwrap_or_else(|| {
                        texts.push(text);
                        texts.len() - 1
                    })
                })
                .collect();

            match self
                .chain
                .translate_batch(&texts, source_lang, language, &self.options, cancel)
                .await
            {
                Ok(translated) => {
                    for (&i, &slot) in members.iter().zip(&slots) {
                        let job = &jobs[i];
                        let result = translated
                            .get(slot)
                            .cloned()
                            .unwrap_or_else(|| ProviderResult::failed(&job.masked_text, 0, "missing result"));
                        if result.succeeded {
                            if let Some(provider) = &result.provider_used {
                                self.cache
                                    .store(&job.masked_text, &job.source_lang, language, &result.text, provider);
                            }
                        }
                        results[i] = Some(result);
                    }
                }
                Err(error) => {
                    error!("{}", error);
                    cancel.store(true, Ordering::SeqCst);
                    for &i in &members {
                        results[i] = Some(ProviderResult::failed(&jobs[i].masked_text, 0, error.reason.clone()));
                    }
                    fatal.get_or_insert(error);
                }
            }
        }

        let results = jobs
            .into_iter()
            .zip(results)
            .map(|(job, result)| {
                let result = result.unwrap_or_else(|| ProviderResult::cancelled(&job.masked_text));
                (job.id, result)
            })
            .collect();
        (results, fatal)
    }

    /// Result of a unit that needs no provider call, if any
    fn settle(&self, job: &TranslationUnit, language: &str, cancel: &AtomicBool) -> Option<ProviderResult> {
        if cancel.load(Ordering::SeqCst) {
            return Some(ProviderResult::cancelled(&job.masked_text));
        }
        if !job.needs_provider() {
            debug!("Unit {} has nothing to translate, keeping it", job.id);
            return Some(ProviderResult::passthrough(&job.masked_text));
        }
        if job.source_lang.eq_ignore_ascii_case(language) {
            debug!("Unit {} is already in {}, keeping it", job.id, language);
            return Some(ProviderResult::passthrough(&job.masked_text));
        }
        self.cache
            .get(&job.masked_text, &job.source_lang, language)
            .map(|hit| ProviderResult {
                text: hit.text,
                succeeded: true,
                provider_used: Some(hit.provider),
                attempts: 0,
                error: None,
            })
    }
}
