//! File-backed disk store
//!
//! Disks live as individual `.dsk` files in one directory. Every call reads
//! straight from the file system; nothing is cached.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::crypto;
use super::types::{DISK_SUFFIX, DiskContent, DiskError, DiskInfo};

/// Reads, decrypts, lists and writes disk files in a directory
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List disk names (files ending in `.dsk`), sorted by name.
    pub async fn list(&self) -> Result<Vec<String>, DiskError> {
        let unavailable = |source| DiskError::StoreUnavailable {
            dir: self.dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(unavailable)?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(unavailable)? {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(DISK_SUFFIX) {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        debug!("Listed {} disks in {}", names.len(), self.dir.display());
        Ok(names)
    }

    /// Load and parse a disk, decrypting first when a key is given.
    ///
    /// An empty key is treated as no key.
    pub async fn load(&self, name: &str, key: Option<&str>) -> Result<DiskContent, DiskError> {
        let path = self.path_for(name)?;

        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => DiskError::NotFound(name.to_string()),
            _ => DiskError::Io {
                name: name.to_string(),
                source: e,
            },
        })?;

        let text = match key.filter(|k| !k.is_empty()) {
            Some(key) => {
                let sealed = String::from_utf8(bytes).map_err(|_| DiskError::Decryption {
                    name: name.to_string(),
                    reason: "ciphertext is not valid text".into(),
                })?;
                let key = key.to_string();
                tokio::task::spawn_blocking(move || crypto::decrypt(&sealed, &key))
                    .await
                    .map_err(|e| DiskError::Decryption {
                        name: name.to_string(),
                        reason: e.to_string(),
                    })?
                    .map_err(|e| DiskError::Decryption {
                        name: name.to_string(),
                        reason: e.to_string(),
                    })?
            }
            None => String::from_utf8(bytes).map_err(|_| DiskError::Malformed {
                name: name.to_string(),
                reason: "disk is not valid UTF-8 (encrypted disk loaded without a key?)".into(),
            })?,
        };

        serde_json::from_str(&text).map_err(|e| DiskError::Malformed {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// File metadata and content digest for one disk
    pub async fn describe(&self, name: &str) -> Result<DiskInfo, DiskError> {
        let path = self.path_for(name)?;
        let io_err = |e: std::io::Error| match e.kind() {
            ErrorKind::NotFound => DiskError::NotFound(name.to_string()),
            _ => DiskError::Io {
                name: name.to_string(),
                source: e,
            },
        };

        let metadata = tokio::fs::metadata(&path).await.map_err(io_err)?;
        let bytes = tokio::fs::read(&path).await.map_err(io_err)?;

        Ok(DiskInfo {
            name: name.to_string(),
            size_bytes: metadata.len(),
            sha256: crypto::sha256_hex(&bytes),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    /// [`DiskStore::describe`] for every listed disk
    pub async fn list_detailed(&self) -> Result<Vec<DiskInfo>, DiskError> {
        let mut infos = Vec::new();
        for name in self.list().await? {
            infos.push(self.describe(&name).await?);
        }
        Ok(infos)
    }

    /// Write a disk as pretty JSON, encrypting it when a key is given.
    pub async fn save(
        &self,
        name: &str,
        content: &DiskContent,
        key: Option<&str>,
    ) -> Result<(), DiskError> {
        let path = self.path_for(name)?;
        let json = serde_json::to_string_pretty(content).map_err(|e| DiskError::Malformed {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        let data = match key.filter(|k| !k.is_empty()) {
            Some(key) => {
                let key = key.to_string();
                tokio::task::spawn_blocking(move || crypto::encrypt(&json, &key))
                    .await
                    .map_err(|e| DiskError::Encryption {
                        name: name.to_string(),
                        reason: e.to_string(),
                    })?
                    .map_err(|e| DiskError::Encryption {
                        name: name.to_string(),
                        reason: e.to_string(),
                    })?
            }
            None => json,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| DiskError::StoreUnavailable {
                dir: self.dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|source| DiskError::Io {
                name: name.to_string(),
                source,
            })?;

        debug!("Wrote disk {} to {}", name, path.display());
        Ok(())
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, DiskError> {
        if !is_valid_name(name) {
            return Err(DiskError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(name))
    }
}

/// Disk names are bare file names inside the store directory
pub fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
