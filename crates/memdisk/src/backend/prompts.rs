//! Prompt rendering for the answering backends
//!
//! Both backends receive the same body: the user prompt followed by one
//! labelled block per context chunk. The local backend gets it as a single
//! completion prompt behind the persona header; the hosted backend gets the
//! persona as a system message and the body as the user message.

use serde_json::Value;

use crate::context::{AssembledContext, ChunkPayload, ContextChunk};

/// Persona and instructions shared by every backend
pub const PERSONA: &str =
    "You are the MemDisk assistant. Use the supplied memory disks to answer the user.";

/// Rendered in place of the memory blocks when no chunk survived assembly
pub const NO_MEMORIES_PLACEHOLDER: &str = "(no memory disks were loaded for this query)";

/// Render one chunk as `Memory k: (source)` followed by its payload
pub fn render_chunk(index: usize, chunk: &ContextChunk) -> String {
    let body = match &chunk.payload {
        ChunkPayload::Full(Value::String(text)) => text.clone(),
        ChunkPayload::Full(value) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        ChunkPayload::Truncated { preview, .. } => format!(
            "{}\n(truncated to {} characters)",
            preview,
            preview.chars().count()
        ),
    };
    format!("Memory {}: ({})\n{}", index + 1, chunk.source, body)
}

/// The memory blocks joined by blank lines, or the placeholder
pub fn render_memories(chunks: &[ContextChunk]) -> String {
    if chunks.is_empty() {
        return NO_MEMORIES_PLACEHOLDER.to_string();
    }
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| render_chunk(i, chunk))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// User prompt plus loaded memories
pub fn render_body(context: &AssembledContext) -> String {
    format!(
        "User Prompt:\n{}\n\nLoaded Memories:\n{}",
        context.prompt,
        render_memories(&context.chunks)
    )
}

/// Single completion prompt for the local backend
pub fn render_local_prompt(context: &AssembledContext) -> String {
    format!("{}\n\n{}", PERSONA, render_body(context))
}
