//! Disk storage
//!
//! Persisted memory disks: listing, loading (with optional decryption),
//! metadata and writing.

pub mod crypto;
pub mod store;
pub mod types;

pub use store::{DiskStore, is_valid_name};
pub use types::{DISK_SUFFIX, Disk, DiskContent, DiskError, DiskInfo, DiskOrigin};

use tracing::warn;

/// Log a disk that was skipped during `stage` (routing or assembly).
///
/// Each failure class gets its own message so a bad key is distinguishable
/// from a missing file in the logs.
pub fn log_skipped_disk(stage: &str, name: &str, err: &DiskError) {
    match err {
        DiskError::NotFound(_) => {
            warn!(stage, kind = err.kind(), "Skipping disk {}: file not found", name)
        }
        DiskError::Decryption { .. } => warn!(
            stage,
            kind = err.kind(),
            "Skipping disk {}: could not decrypt with the supplied key",
            name
        ),
        DiskError::Malformed { reason, .. } => warn!(
            stage,
            kind = err.kind(),
            "Skipping disk {}: content is not valid JSON ({})",
            name,
            reason
        ),
        other => warn!(stage, kind = other.kind(), "Skipping disk {}: {}", name, other),
    }
}
