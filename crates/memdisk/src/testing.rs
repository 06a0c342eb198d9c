//! Test utilities for memdisk - scripted generators, recording backends and
//! disk directory fixtures
//!
//! Used by the unit tests in this crate and by the integration tests under
//! `tests/`, so pipelines can be exercised without a model server.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use crate::backend::{
    ActiveModel, Backend, BackendError, Dispatcher, GenerationOptions, TextGenerator,
};
use crate::context::{AssembledContext, ContextAssembler, DEFAULT_CHAR_BUDGET};
use crate::disk::{DiskContent, DiskError, DiskStore};
use crate::pipeline::QueryPipeline;
use crate::routing::RelevanceClassifier;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Text generator that returns a fixed reply (or fails) and records prompts
#[derive(Debug)]
pub struct ScriptedGenerator {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    /// Always answer with `reply`
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always fail with a request error carrying `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _model: &str,
        _options: &GenerationOptions,
    ) -> Result<String, BackendError> {
        lock(&self.prompts).push(prompt.to_string());
        self.reply.clone().map_err(BackendError::Request)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Backend that records every context and model it is sent
#[derive(Debug)]
pub struct RecordingBackend {
    reply: String,
    sent: Mutex<Vec<(AssembledContext, String)>>,
}

impl RecordingBackend {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn contexts(&self) -> Vec<AssembledContext> {
        lock(&self.sent).iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn models(&self) -> Vec<String> {
        lock(&self.sent).iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn last_context(&self) -> Option<AssembledContext> {
        lock(&self.sent).last().map(|(c, _)| c.clone())
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn send(&self, context: &AssembledContext, model: &str) -> Result<String, BackendError> {
        lock(&self.sent).push((context.clone(), model.to_string()));
        Ok(self.reply.clone())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Temporary disk directory with a store over it
#[derive(Debug)]
pub struct DiskFixture {
    dir: TempDir,
    store: Arc<DiskStore>,
}

impl DiskFixture {
    pub fn new() -> std::io::Result<Self> {
        let dir = TempDir::new()?;
        let store = Arc::new(DiskStore::new(dir.path()));
        Ok(Self { dir, store })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store(&self) -> Arc<DiskStore> {
        self.store.clone()
    }

    /// Write a plaintext disk
    pub async fn add(&self, name: &str, content: &DiskContent) -> Result<(), DiskError> {
        self.store.save(name, content, None).await
    }

    /// Write a disk encrypted with `key`
    pub async fn add_encrypted(
        &self,
        name: &str,
        content: &DiskContent,
        key: &str,
    ) -> Result<(), DiskError> {
        self.store.save(name, content, Some(key)).await
    }

    /// Write raw bytes, bypassing serialization
    pub fn add_raw(&self, name: &str, bytes: &[u8]) -> std::io::Result<()> {
        std::fs::write(self.dir.path().join(name), bytes)
    }

    /// A pipeline over this fixture's store with the given collaborators
    pub fn pipeline(
        &self,
        generator: Arc<dyn TextGenerator>,
        backend: Arc<dyn Backend>,
    ) -> QueryPipeline {
        self.pipeline_with_budget(generator, backend, DEFAULT_CHAR_BUDGET)
    }

    pub fn pipeline_with_budget(
        &self,
        generator: Arc<dyn TextGenerator>,
        backend: Arc<dyn Backend>,
        char_budget: usize,
    ) -> QueryPipeline {
        let classifier = RelevanceClassifier::new(
            self.store(),
            generator,
            "test-router",
            GenerationOptions::default(),
        );
        let assembler = ContextAssembler::new(self.store(), char_budget);
        let dispatcher = Dispatcher::new(backend, ActiveModel::new("test-model"));
        QueryPipeline::new(self.store(), classifier, assembler, dispatcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn scripted_generator_records_prompts() {
        let generator = ScriptedGenerator::replying("ok");
        let out = generator
            .generate("hello", "m", &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(out, "ok");
        assert_eq!(generator.prompts(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn failing_generator_returns_request_error() {
        let generator = ScriptedGenerator::failing("down");
        let err = generator
            .generate("hello", "m", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Request(ref m) if m == "down"));
    }

    #[tokio::test]
    async fn fixture_round_trips_disks() {
        let fixture = DiskFixture::new().unwrap();
        fixture.add("a.dsk", &json!({"persona": "A"})).await.unwrap();
        fixture.add_raw("notes.txt", b"ignored").unwrap();

        let names = fixture.store().list().await.unwrap();
        assert_eq!(names, vec!["a.dsk".to_string()]);
    }
}
