//! Disk routing
//!
//! Chooses which memory disks are relevant to a prompt.

pub mod catalog;
pub mod classifier;
pub mod prompts;
pub mod selection;
pub mod types;

pub use catalog::{build_catalog, summarize_disk};
pub use classifier::RelevanceClassifier;
pub use selection::{Selection, extract_json_object, parse_selection};
pub use types::{NO_DISKS_ANALYSIS, RoutingResult, SelectionResponse};
