//! Context types handed from the assembler to the dispatcher

use serde::{Deserialize, Deserializer, Serialize};

use crate::disk::{DiskContent, DiskOrigin};
use crate::routing::RoutingResult;

/// Payload of one context chunk: the disk content, or a cut preview of its
/// serialized form when it exceeded the character budget.
///
/// Serialize-only: a full payload may itself look like a preview object, so
/// the untagged form cannot be read back unambiguously.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChunkPayload {
    Truncated { preview: String, truncated: bool },
    Full(DiskContent),
}

impl ChunkPayload {
    pub fn is_truncated(&self) -> bool {
        matches!(self, ChunkPayload::Truncated { .. })
    }
}

/// One disk's contribution to the context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextChunk {
    /// Disk name
    pub source: String,
    pub origin: DiskOrigin,
    pub payload: ChunkPayload,
}

/// Everything the dispatcher needs for one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledContext {
    pub prompt: String,
    /// Persisted disks first, then inline disks, each group in original order
    pub chunks: Vec<ContextChunk>,
    pub routing: RoutingResult,
}

/// Ephemeral, unencrypted disk supplied with a single request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineDisk {
    #[serde(default)]
    pub name: String,
    /// `None` only when the field is absent; an explicit `null` is content
    #[serde(
        default,
        deserialize_with = "present_content",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<DiskContent>,
}

fn present_content<'de, D>(deserializer: D) -> Result<Option<DiskContent>, D::Error>
where
    D: Deserializer<'de>,
{
    DiskContent::deserialize(deserializer).map(Some)
}

impl InlineDisk {
    pub fn new(name: impl Into<String>, content: DiskContent) -> Self {
        Self {
            name: name.into(),
            content: Some(content),
        }
    }
}
