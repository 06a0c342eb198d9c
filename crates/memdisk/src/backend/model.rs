//! Runtime-switchable model id

use std::sync::{Arc, RwLock};

/// Holder of the active model id.
///
/// Clones share the same value. The dispatcher reads it on every call, so a
/// [`ActiveModel::set`] takes effect on the next query.
#[derive(Debug, Clone)]
pub struct ActiveModel {
    inner: Arc<RwLock<String>>,
}

impl ActiveModel {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial.into())),
        }
    }

    pub fn get(&self) -> String {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the model id. Last write wins.
    pub fn set(&self, id: impl Into<String>) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = id.into();
    }
}
