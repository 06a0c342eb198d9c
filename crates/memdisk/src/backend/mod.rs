//! LLM backends
//!
//! Two seams live here. [`TextGenerator`] is raw prompt-in, text-out and is
//! what the relevance classifier uses. [`Backend`] answers a query from an
//! assembled context and is what the dispatcher uses. The local client
//! implements both; the hosted client implements only [`Backend`].

pub mod dispatcher;
pub mod hosted;
pub mod local;
pub mod model;
pub mod prompts;
pub mod types;

use async_trait::async_trait;

use crate::context::AssembledContext;

pub use dispatcher::Dispatcher;
pub use hosted::HostedBackend;
pub use local::{LocalBackend, mock_response};
pub use model::ActiveModel;
pub use types::{BackendError, BackendKind, GenerationOptions, LocalMode};

/// Prompt in, text out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        options: &GenerationOptions,
    ) -> Result<String, BackendError>;

    /// Generator name for logging
    fn name(&self) -> &'static str;
}

/// Answers a query from assembled context
#[async_trait]
pub trait Backend: Send + Sync {
    /// Send the context to `model` and return the raw completion text
    async fn send(&self, context: &AssembledContext, model: &str) -> Result<String, BackendError>;

    /// Fail fast on anything that would make `send` fail before it reaches
    /// the network, such as a missing credential
    fn preflight(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
