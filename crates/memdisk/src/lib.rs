//! MemDisk - route prompts through relevant memory disks
//!
//! A memory disk is a named JSON document (optionally encrypted) holding a
//! persona, skills, knowledge and quotes. For each prompt this crate selects
//! the relevant disks with a small local model, assembles them into a bounded
//! context, sends that to a local or hosted LLM and cleans up the answer.

pub mod backend;
pub mod config;
pub mod context;
pub mod disk;
pub mod error;
pub mod pipeline;
pub mod routing;
pub mod sanitize;
pub mod server;
pub mod testing;

pub use error::MemdiskError;
pub use pipeline::{QueryPipeline, QueryRequest, QueryResponse};
