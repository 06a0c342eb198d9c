//! Dispatch of assembled context to the configured backend

use std::sync::Arc;
use tracing::{info, instrument};

use crate::backend::hosted::HostedBackend;
use crate::backend::local::LocalBackend;
use crate::backend::model::ActiveModel;
use crate::backend::types::{BackendError, BackendKind};
use crate::backend::Backend;
use crate::config::BackendConfig;
use crate::context::AssembledContext;

/// Sends context to the backend chosen at startup, using whichever model id
/// is active at the moment of the call.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn Backend>,
    model: ActiveModel,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("backend", &self.backend.name())
            .field("model", &self.model.get())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn Backend>, model: ActiveModel) -> Self {
        Self { backend, model }
    }

    /// Build the backend selected by `config.mode`
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let backend: Arc<dyn Backend> = match BackendKind::from(config.mode) {
            BackendKind::Local(mode) => Arc::new(LocalBackend::new(&config.local, mode)?),
            BackendKind::Hosted => Arc::new(HostedBackend::new(&config.hosted)?),
        };
        let model = ActiveModel::new(config.initial_model());
        info!(
            "Dispatcher using {} backend with model {}",
            backend.name(),
            model.get()
        );
        Ok(Self::new(backend, model))
    }

    #[instrument(skip_all, fields(backend = self.backend.name()))]
    pub async fn send(&self, context: &AssembledContext) -> Result<String, BackendError> {
        let model = self.model.get();
        info!(
            "Dispatching {} chunks to model {}",
            context.chunks.len(),
            model
        );
        self.backend.send(context, &model).await
    }

    /// Check the backend can be called before any other work is done
    pub fn preflight(&self) -> Result<(), BackendError> {
        self.backend.preflight()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn model(&self) -> String {
        self.model.get()
    }

    pub fn set_model(&self, id: impl Into<String>) {
        let id = id.into();
        info!("Active model set to {}", id);
        self.model.set(id);
    }

    /// Shared handle to the active model
    pub fn active_model(&self) -> &ActiveModel {
        &self.model
    }
}
