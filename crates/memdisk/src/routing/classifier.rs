//! Relevance classifier
//!
//! Loads the candidate disks, asks the selection model which of them matter
//! for the prompt, and falls back to all loaded disks whenever the answer is
//! unusable. At most one model call is made per query.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::backend::{BackendError, GenerationOptions, TextGenerator};
use crate::disk::{DiskContent, DiskStore, log_skipped_disk};
use crate::routing::catalog::build_catalog;
use crate::routing::prompts::render_selection_prompt;
use crate::routing::selection::{Selection, parse_selection};
use crate::routing::types::RoutingResult;

pub struct RelevanceClassifier {
    store: Arc<DiskStore>,
    generator: Arc<dyn TextGenerator>,
    model: String,
    options: GenerationOptions,
}

impl std::fmt::Debug for RelevanceClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelevanceClassifier")
            .field("generator", &self.generator.name())
            .field("model", &self.model)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RelevanceClassifier {
    pub fn new(
        store: Arc<DiskStore>,
        generator: Arc<dyn TextGenerator>,
        model: impl Into<String>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            store,
            generator,
            model: model.into(),
            options,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Decide which of `candidates` are relevant to `prompt`.
    ///
    /// Disks that fail to load are logged and left out. A generator failure
    /// is returned as an error; a malformed answer is not.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn route(
        &self,
        prompt: &str,
        candidates: &[String],
        key: Option<&str>,
    ) -> Result<RoutingResult, BackendError> {
        let mut order: Vec<String> = Vec::with_capacity(candidates.len());
        let mut loaded: BTreeMap<String, DiskContent> = BTreeMap::new();

        for name in unique_candidates(candidates) {
            match self.store.load(name, key).await {
                Ok(content) => {
                    order.push(name.clone());
                    loaded.insert(name.clone(), content);
                }
                Err(e) => log_skipped_disk("routing", name, &e),
            }
        }

        if loaded.is_empty() {
            info!("No candidate disks could be loaded, skipping selection");
            return Ok(RoutingResult::no_disks());
        }

        let catalog = build_catalog(
            order
                .iter()
                .filter_map(|name| loaded.get(name).map(|c| (name.as_str(), c))),
        );
        let selection_prompt = render_selection_prompt(prompt, &catalog);

        debug!(
            "Asking {} ({}) to choose among {} disks",
            self.generator.name(),
            self.model,
            order.len()
        );
        let raw = self
            .generator
            .generate(&selection_prompt, &self.model, &self.options)
            .await?;

        let result = match parse_selection(&raw, &order) {
            Selection::Chosen { names, notes } => RoutingResult::selected(names, notes, loaded),
            Selection::Fallback => RoutingResult::selected(order, raw, loaded),
        };

        info!(
            "Routing selected {} of {} loaded disks",
            result.relevant_disk_names().len(),
            result.loaded_disks().len()
        );
        Ok(result)
    }
}

/// Candidate names in first-seen order, each at most once, so a repeated
/// name is read from the store a single time whether or not it loads.
fn unique_candidates(candidates: &[String]) -> Vec<&String> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_candidates_collapses_failing_duplicates() {
        let candidates: Vec<String> = ["b.dsk", "ghost.dsk", "b.dsk", "ghost.dsk", "a.dsk"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            unique_candidates(&candidates),
            ["b.dsk", "ghost.dsk", "a.dsk"]
        );
    }
}
