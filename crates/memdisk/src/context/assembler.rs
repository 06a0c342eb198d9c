//! Context assembly
//!
//! Merges routed disks with inline disks and applies the per-chunk character
//! budget. The budget bounds each chunk, not the total: a query with many
//! relevant disks can still exceed a backend's overall context window.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::context::types::{AssembledContext, ChunkPayload, ContextChunk, InlineDisk};
use crate::disk::{Disk, DiskContent, DiskOrigin, DiskStore, log_skipped_disk};
use crate::routing::RoutingResult;

/// Default per-chunk character budget
pub const DEFAULT_CHAR_BUDGET: usize = 12_000;

/// Serialized form used for budgeting: strings as-is, everything else as
/// compact JSON. Object keys serialize in sorted order, so equal content
/// always yields the same string.
pub fn serialize_content(content: &DiskContent) -> String {
    match content {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Keep content whole when it fits the budget, otherwise cut its serialized
/// form to the first `budget` characters.
pub fn apply_budget(content: &DiskContent, budget: usize) -> ChunkPayload {
    let serialized = serialize_content(content);
    if serialized.chars().count() <= budget {
        return ChunkPayload::Full(content.clone());
    }
    ChunkPayload::Truncated {
        preview: serialized.chars().take(budget).collect(),
        truncated: true,
    }
}

/// Inline disks that will be used: non-empty name and defined content.
/// A repeated name keeps its first position and takes the last content.
pub fn collect_inline_disks(inline: &[InlineDisk]) -> Vec<Disk> {
    let mut disks: Vec<Disk> = Vec::new();
    for entry in inline {
        let Some(content) = entry.content.as_ref() else {
            continue;
        };
        if entry.name.trim().is_empty() {
            continue;
        }
        match disks.iter_mut().find(|d| d.name == entry.name) {
            Some(existing) => existing.content = content.clone(),
            None => disks.push(Disk::inline(entry.name.clone(), content.clone())),
        }
    }
    disks
}

/// Builds the ordered, budgeted context for a query
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    store: Arc<DiskStore>,
    char_budget: usize,
}

impl ContextAssembler {
    pub fn new(store: Arc<DiskStore>, char_budget: usize) -> Self {
        Self { store, char_budget }
    }

    pub fn char_budget(&self) -> usize {
        self.char_budget
    }

    pub async fn assemble(
        &self,
        routing: RoutingResult,
        prompt: &str,
        key: Option<&str>,
        inline: &[InlineDisk],
    ) -> AssembledContext {
        let inline_disks = collect_inline_disks(inline);
        let routing = routing
            .with_inline_disks(inline_disks.iter().map(|d| d.name.clone()).collect());

        let mut chunks = Vec::new();
        let mut fetched = BTreeMap::new();

        for name in routing.relevant_disk_names() {
            if let Some(content) = routing.loaded_disk(name) {
                chunks.push(self.chunk(name, DiskOrigin::Persisted, content));
                continue;
            }
            if routing.inline_disk_names().contains(name) {
                continue;
            }

            debug!("Disk {} was not preloaded, loading from store", name);
            match self.store.load(name, key).await {
                Ok(content) => {
                    chunks.push(self.chunk(name, DiskOrigin::Persisted, &content));
                    fetched.insert(name.clone(), content);
                }
                Err(e) => log_skipped_disk("assembly", name, &e),
            }
        }
        let routing = routing.with_fetched(fetched);

        for disk in &inline_disks {
            chunks.push(self.chunk(&disk.name, DiskOrigin::Inline, &disk.content));
        }

        let truncated = chunks.iter().filter(|c| c.payload.is_truncated()).count();
        info!(
            "Assembled context with {} chunks ({} truncated)",
            chunks.len(),
            truncated
        );

        AssembledContext {
            prompt: prompt.to_string(),
            chunks,
            routing,
        }
    }

    fn chunk(&self, name: &str, origin: DiskOrigin, content: &DiskContent) -> ContextChunk {
        let payload = apply_budget(content, self.char_budget);
        if payload.is_truncated() {
            debug!(
                "Disk {} exceeds the {} character budget, sending a preview",
                name, self.char_budget
            );
        }
        ContextChunk {
            source: name.to_string(),
            origin,
            payload,
        }
    }
}
