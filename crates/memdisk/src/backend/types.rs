//! Backend types shared by the local and hosted clients

use crate::config::BackendMode;

/// Sampling limits for one generation call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: 256,
            temperature: 0.4,
        }
    }
}

/// Whether the local backend talks to a live model server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalMode {
    Live,
    Mock,
}

/// The backend chosen for a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local(LocalMode),
    Hosted,
}

impl From<BackendMode> for BackendKind {
    fn from(mode: BackendMode) -> Self {
        match mode {
            BackendMode::Local => BackendKind::Local(LocalMode::Live),
            BackendMode::Mock => BackendKind::Local(LocalMode::Mock),
            BackendMode::Hosted => BackendKind::Hosted,
        }
    }
}

/// Text-generation and dispatch errors
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(
        "Hosted backend requires an API key: set the {var} environment variable and restart"
    )]
    MissingCredential { var: String },

    #[error("Backend returned an empty completion")]
    EmptyCompletion,

    #[error("Prompt is required for text generation")]
    EmptyPrompt,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Backend returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Backend configuration error: {0}")]
    Config(String),
}
