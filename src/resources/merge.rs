/*!
 * Folding several locale documents into one.
 *
 * Sources are ranked by an explicit precedence order, lowest first. The lowest
 * ranked document is the skeleton; every higher one is folded in turn, so the
 * last writer wins for any shared key.
 */

use std::collections::{BTreeSet, HashMap};

use log::{debug, info, warn};

use super::{ResourceDocument, UnitId};
use crate::errors::MergeError;

/// One input document with the locale it was written in
#[derive(Debug, Clone)]
pub struct LocaleSource {
    /// Locale code, e.g. `en` or `pt-BR`
    pub locale: String,
    /// Parsed document
    pub document: ResourceDocument,
}

impl LocaleSource {
    pub fn new(locale: impl Into<String>, document: ResourceDocument) -> Self {
        Self {
            locale: locale.into(),
            document,
        }
    }
}

/// A key whose value changed while folding sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictNote {
    /// Leaf that changed
    pub id: UnitId,
    /// Locale that supplied the overridden value
    pub previous_locale: String,
    /// Locale whose value is kept
    pub winning_locale: String,
    /// Overridden value, `None` when the leaf did not exist before
    pub previous: Option<String>,
    /// Kept value, `None` when a wholesale replacement dropped the leaf
    pub chosen: Option<String>,
}

/// Result of a merge
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Combined document
    pub document: ResourceDocument,
    /// Every value that was overridden, in fold order
    pub conflicts: Vec<ConflictNote>,
    /// Locale each leaf of `document` came from
    pub origins: HashMap<UnitId, String>,
}

impl MergeOutcome {
    /// Locale a leaf came from
    pub fn origin(&self, id: &UnitId) -> Option<&str> {
        self.origins.get(id).map(String::as_str)
    }
}

/// Combines locale documents by precedence
#[derive(Debug, Default, Clone, Copy)]
pub struct LocaleMerger;

impl LocaleMerger {
    /// Merge `sources`, ranked by `precedence` from lowest to highest
    ///
    /// Every source locale must appear in `precedence`, and every locale in
    /// `precedence` must have a source.
    pub fn merge(sources: &[LocaleSource], precedence: &[String]) -> Result<MergeOutcome, MergeError> {
        if sources.is_empty() {
            return Err(MergeError::NoSources);
        }
        for source in sources {
            if !precedence.iter().any(|locale| locale == &source.locale) {
                return Err(MergeError::Unranked(source.locale.clone()));
            }
        }

        let mut ranked = Vec::with_capacity(precedence.len());
        for locale in precedence {
            let source = sources
                .iter()
                .find(|s| &s.locale == locale)
                .ok_or_else(|| MergeError::UnknownLocale(locale.clone()))?;
            ranked.push(source);
        }

        let base = ranked[0];
        let mut document = base.document.clone();
        let mut origins: HashMap<UnitId, String> = HashMap::new();
        for entry in document.entries() {
            for id in entry.unit_ids() {
                origins.insert(id, base.locale.clone());
            }
        }
        let mut conflicts = Vec::new();

        for higher in &ranked[1..] {
            let before = conflicts.len();
            fold(&mut document, &mut origins, &mut conflicts, higher);
            debug!(
                "Folded locale '{}' into merge result ({} conflicts)",
                higher.locale,
                conflicts.len() - before
            );
        }

        info!(
            "Merged {} locale documents into {} entries with {} conflicts",
            ranked.len(),
            document.entries().len(),
            conflicts.len()
        );

        Ok(MergeOutcome {
            document,
            conflicts,
            origins,
        })
    }
}

fn fold(
    document: &mut ResourceDocument,
    origins: &mut HashMap<UnitId, String>,
    conflicts: &mut Vec<ConflictNote>,
    higher: &LocaleSource,
) {
    for (slot_in_higher, entry) in higher.document.entries().iter().enumerate() {
        let Some(slot) = document.slot_index(entry.kind(), entry.name()) else {
            let (entry, layout) = higher.document.slot(slot_in_higher);
            for id in entry.unit_ids() {
                origins.insert(id, higher.locale.clone());
            }
            document.append_slot(entry.clone(), layout.to_vec());
            continue;
        };

        let (current, _) = document.slot(slot);
        if !current.is_translatable() {
            debug!(
                "Keeping non-translatable {} '{}' over locale '{}'",
                current.kind(),
                current.name(),
                higher.locale
            );
            continue;
        }

        let current_ids: BTreeSet<UnitId> = current.unit_ids().into_iter().collect();
        let higher_ids: BTreeSet<UnitId> = entry.unit_ids().into_iter().collect();

        if current_ids != higher_ids {
            warn!(
                "{} '{}' has different items in locale '{}', replacing it wholesale",
                entry.kind(),
                entry.name(),
                higher.locale
            );
            for id in current_ids.union(&higher_ids) {
                let previous = current.leaf(id).map(str::to_string);
                let chosen = entry.leaf(id).map(str::to_string);
                if previous != chosen {
                    conflicts.push(ConflictNote {
                        id: id.clone(),
                        previous_locale: origins.get(id).cloned().unwrap_or_default(),
                        winning_locale: higher.locale.clone(),
                        previous,
                        chosen,
                    });
                }
            }
            for id in &current_ids {
                origins.remove(id);
            }
            for id in &higher_ids {
                origins.insert(id.clone(), higher.locale.clone());
            }
            let (entry, layout) = higher.document.slot(slot_in_higher);
            document.replace_slot(slot, entry.clone(), layout.to_vec());
            continue;
        }

        let mut changes = Vec::new();
        for (id, chosen) in entry.leaves() {
            let previous = current.leaf(&id).unwrap_or_default();
            if previous != chosen {
                changes.push((id, previous.to_string(), chosen.to_string()));
            } else {
                origins.insert(id, higher.locale.clone());
            }
        }
        for (id, previous, chosen) in changes {
            debug!("Locale '{}' overrides {}", higher.locale, id);
            conflicts.push(ConflictNote {
                id: id.clone(),
                previous_locale: origins.get(&id).cloned().unwrap_or_default(),
                winning_locale: higher.locale.clone(),
                previous: Some(previous),
                chosen: Some(chosen.clone()),
            });
            document.set_leaf(slot, &id, chosen);
            origins.insert(id, higher.locale.clone());
        }
    }
}
