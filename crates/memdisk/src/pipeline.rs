//! Query pipeline
//!
//! One query flows through classifier, assembler, dispatcher and sanitizer
//! in that order. Each stage is awaited before the next begins; the only
//! state shared between queries is the active model id.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::backend::{Dispatcher, GenerationOptions, LocalBackend, LocalMode, TextGenerator};
use crate::config::{BackendMode, Config};
use crate::context::{ContextAssembler, InlineDisk};
use crate::disk::{DiskContent, DiskInfo, DiskStore};
use crate::error::{MemdiskError, Result};
use crate::routing::{RelevanceClassifier, RoutingResult};
use crate::sanitize::sanitize;

/// A query as received from a caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub prompt: String,
    /// Candidate persisted disk names
    #[serde(default)]
    pub disks: Vec<String>,
    #[serde(default)]
    pub encryption_key: Option<String>,
    #[serde(default)]
    pub inline_disks: Vec<InlineDisk>,
    /// Treat every candidate as relevant without asking the classifier
    #[serde(default)]
    pub skip_routing: bool,
}

impl QueryRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_disks(mut self, disks: Vec<String>) -> Self {
        self.disks = disks;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.encryption_key = Some(key.into());
        self
    }

    pub fn with_inline_disks(mut self, inline: Vec<InlineDisk>) -> Self {
        self.inline_disks = inline;
        self
    }

    fn key(&self) -> Option<&str> {
        self.encryption_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// Sanitized answer plus the routing record that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub output: String,
    pub routing: RoutingResult,
}

/// The full query pipeline over one disk store and one backend
#[derive(Debug)]
pub struct QueryPipeline {
    store: Arc<DiskStore>,
    classifier: RelevanceClassifier,
    assembler: ContextAssembler,
    dispatcher: Dispatcher,
}

impl QueryPipeline {
    pub fn new(
        store: Arc<DiskStore>,
        classifier: RelevanceClassifier,
        assembler: ContextAssembler,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            store,
            classifier,
            assembler,
            dispatcher,
        }
    }

    /// Wire the pipeline from configuration.
    ///
    /// The classifier always runs on the local model server (echoing in mock
    /// mode); the dispatcher uses the configured backend.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(DiskStore::new(&config.storage.disk_dir));

        let local_mode = match config.backend.mode {
            BackendMode::Mock => LocalMode::Mock,
            BackendMode::Local | BackendMode::Hosted => LocalMode::Live,
        };
        let generator: Arc<dyn TextGenerator> =
            Arc::new(LocalBackend::new(&config.backend.local, local_mode)?);
        let classifier = RelevanceClassifier::new(
            store.clone(),
            generator,
            config.routing_model(),
            GenerationOptions {
                max_tokens: config.routing.max_tokens,
                temperature: config.routing.temperature,
            },
        );

        let assembler = ContextAssembler::new(store.clone(), config.context.char_budget);
        let dispatcher = Dispatcher::from_config(&config.backend)?;

        Ok(Self::new(store, classifier, assembler, dispatcher))
    }

    /// Route, assemble, dispatch and sanitize one query
    pub async fn handle_query(&self, request: QueryRequest) -> Result<QueryResponse> {
        let span = info_span!("query", request_id = %Uuid::new_v4());
        self.run_query(request).instrument(span).await
    }

    async fn run_query(&self, request: QueryRequest) -> Result<QueryResponse> {
        if request.prompt.trim().is_empty() {
            return Err(MemdiskError::InvalidRequest("Prompt is required".to_string()));
        }
        self.dispatcher.preflight()?;
        info!(
            "Handling query with {} candidate disks and {} inline disks",
            request.disks.len(),
            request.inline_disks.len()
        );

        let key = request.key();
        let routing = if request.skip_routing {
            RoutingResult::bypass(request.disks.clone())
        } else {
            self.classifier
                .route(&request.prompt, &request.disks, key)
                .await
                .map_err(MemdiskError::Classifier)?
        };

        let context = self
            .assembler
            .assemble(routing, &request.prompt, key, &request.inline_disks)
            .await;

        let raw = self.dispatcher.send(&context).await?;
        let output = sanitize(&raw);

        info!("Query answered with {} characters", output.chars().count());
        Ok(QueryResponse {
            output,
            routing: context.routing,
        })
    }

    pub async fn list_disks(&self) -> Result<Vec<String>> {
        Ok(self.store.list().await?)
    }

    pub async fn list_disks_detailed(&self) -> Result<Vec<DiskInfo>> {
        Ok(self.store.list_detailed().await?)
    }

    /// Load one disk's content without routing or truncation
    pub async fn load_disk_raw(&self, name: &str, key: Option<&str>) -> Result<DiskContent> {
        let key = key.filter(|k| !k.is_empty());
        Ok(self.store.load(name, key).await?)
    }

    pub fn active_model(&self) -> String {
        self.dispatcher.model()
    }

    pub fn set_active_model(&self, id: &str) -> Result<()> {
        let id = id.trim();
        if id.is_empty() {
            return Err(MemdiskError::InvalidRequest(
                "Model id must not be empty".to_string(),
            ));
        }
        self.dispatcher.set_model(id);
        Ok(())
    }

    pub fn backend_name(&self) -> &'static str {
        self.dispatcher.backend_name()
    }

    pub fn store(&self) -> &DiskStore {
        &self.store
    }
}
