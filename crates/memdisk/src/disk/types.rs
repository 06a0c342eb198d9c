//! Disk types
//!
//! A disk is a named blob of structured memory (persona, skills, knowledge,
//! quotes, or anything else JSON can carry).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File suffix recognized by the store
pub const DISK_SUFFIX: &str = ".dsk";

/// Disk content: arbitrary JSON, including a bare string
pub type DiskContent = serde_json::Value;

/// Where a disk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskOrigin {
    /// Stored in the disk directory
    Persisted,
    /// Supplied by the caller for a single request
    Inline,
}

/// A named unit of memory content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disk {
    pub name: String,
    pub content: DiskContent,
    pub origin: DiskOrigin,
}

impl Disk {
    pub fn persisted(name: impl Into<String>, content: DiskContent) -> Self {
        Self {
            name: name.into(),
            content,
            origin: DiskOrigin::Persisted,
        }
    }

    pub fn inline(name: impl Into<String>, content: DiskContent) -> Self {
        Self {
            name: name.into(),
            content,
            origin: DiskOrigin::Inline,
        }
    }
}

/// File-level metadata for a persisted disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    pub name: String,
    pub size_bytes: u64,
    /// SHA-256 of the stored bytes (ciphertext for encrypted disks)
    pub sha256: String,
    pub modified: Option<DateTime<Utc>>,
}

/// Disk store errors
#[derive(Debug, thiserror::Error)]
pub enum DiskError {
    #[error("Disk store unavailable at {}: {source}", .dir.display())]
    StoreUnavailable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Disk not found: {0}")]
    NotFound(String),

    #[error("Invalid disk name: '{0}'")]
    InvalidName(String),

    #[error("Malformed disk {name}: {reason}")]
    Malformed { name: String, reason: String },

    #[error("Failed to decrypt disk {name}: {reason}")]
    Decryption { name: String, reason: String },

    #[error("Failed to encrypt disk {name}: {reason}")]
    Encryption { name: String, reason: String },

    #[error("I/O error on disk {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl DiskError {
    /// Short label used when logging skipped disks
    pub fn kind(&self) -> &'static str {
        match self {
            DiskError::StoreUnavailable { .. } => "store_unavailable",
            DiskError::NotFound(_) => "not_found",
            DiskError::InvalidName(_) => "invalid_name",
            DiskError::Malformed { .. } => "malformed",
            DiskError::Decryption { .. } => "decryption_failed",
            DiskError::Encryption { .. } => "encryption_failed",
            DiskError::Io { .. } => "io",
        }
    }
}
