//! Context assembly for dispatch

pub mod assembler;
pub mod types;

pub use assembler::{
    ContextAssembler, DEFAULT_CHAR_BUDGET, apply_budget, collect_inline_disks, serialize_content,
};
pub use types::{AssembledContext, ChunkPayload, ContextChunk, InlineDisk};
