//! Routing types
//!
//! [`RoutingResult`] records which disks were judged relevant for one query
//! and why. It is built once per query and read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::disk::DiskContent;

/// Analysis text used when no candidate disk could be loaded
pub const NO_DISKS_ANALYSIS: &str = "No disks available";

/// Outcome of relevance classification for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingResult {
    relevant_disk_names: Vec<String>,
    analysis: String,
    loaded_disks: BTreeMap<String, DiskContent>,
    #[serde(default)]
    inline_disk_names: Vec<String>,
}

impl RoutingResult {
    /// Result for a query where no candidate disk was usable
    pub fn no_disks() -> Self {
        Self {
            relevant_disk_names: Vec::new(),
            analysis: NO_DISKS_ANALYSIS.to_string(),
            loaded_disks: BTreeMap::new(),
            inline_disk_names: Vec::new(),
        }
    }

    /// Build a result from a selection over loaded disks.
    ///
    /// Names without loaded content are dropped so the result never points
    /// at content it does not carry.
    pub fn selected(
        relevant: Vec<String>,
        analysis: impl Into<String>,
        loaded_disks: BTreeMap<String, DiskContent>,
    ) -> Self {
        let relevant_disk_names = relevant
            .into_iter()
            .filter(|name| loaded_disks.contains_key(name))
            .collect();
        Self {
            relevant_disk_names,
            analysis: analysis.into(),
            loaded_disks,
            inline_disk_names: Vec::new(),
        }
    }

    /// Result for a caller that skips classification and names the disks
    /// directly. The assembler loads their content from the store.
    pub fn bypass(names: Vec<String>) -> Self {
        let mut relevant_disk_names: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            if !relevant_disk_names.contains(&name) {
                relevant_disk_names.push(name);
            }
        }
        Self {
            relevant_disk_names,
            analysis: "Routing bypassed".to_string(),
            loaded_disks: BTreeMap::new(),
            inline_disk_names: Vec::new(),
        }
    }

    /// Attach the names of the inline disks that accompany this query
    pub fn with_inline_disks(mut self, names: Vec<String>) -> Self {
        self.inline_disk_names = names;
        self
    }

    /// Record content the assembler loaded itself and drop relevant names
    /// that ended up with neither loaded content nor an inline disk.
    pub fn with_fetched(mut self, fetched: BTreeMap<String, DiskContent>) -> Self {
        self.loaded_disks.extend(fetched);
        let (loaded, inline) = (&self.loaded_disks, &self.inline_disk_names);
        self.relevant_disk_names
            .retain(|name| loaded.contains_key(name) || inline.contains(name));
        self
    }

    pub fn relevant_disk_names(&self) -> &[String] {
        &self.relevant_disk_names
    }

    pub fn analysis(&self) -> &str {
        &self.analysis
    }

    pub fn loaded_disks(&self) -> &BTreeMap<String, DiskContent> {
        &self.loaded_disks
    }

    pub fn loaded_disk(&self, name: &str) -> Option<&DiskContent> {
        self.loaded_disks.get(name)
    }

    pub fn inline_disk_names(&self) -> &[String] {
        &self.inline_disk_names
    }
}

/// Shape the selection model is asked to answer with
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectionResponse {
    pub selected: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}
