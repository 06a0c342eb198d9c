//! Hosted backend using an OpenAI-compatible chat completions API
//!
//! Sends one system message (the persona) and one user message (prompt plus
//! rendered memories). The API key is read from the configured environment
//! variable at send time, so a missing key fails the query with guidance
//! instead of failing startup. Requests are made exactly once.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, info};

use crate::backend::Backend;
use crate::backend::prompts::{PERSONA, render_body};
use crate::backend::types::{BackendError, GenerationOptions};
use crate::config::HostedBackendConfig;
use crate::context::AssembledContext;

/// Sent as `X-Title` so the provider can attribute traffic
const APP_TITLE: &str = "MemDisk";

/// Client for a hosted chat completions API
#[derive(Debug, Clone)]
pub struct HostedBackend {
    client: Client,
    config: HostedBackendConfig,
    api_key: Option<String>,
}

/// OpenAI-compatible chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

/// Message in the chat completion request
#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

/// Choice in the chat completion response
#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

/// Message in the response choice
#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl HostedBackend {
    pub fn new(config: &HostedBackendConfig) -> Result<Self, BackendError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;

        info!(
            "HostedBackend initialized with api_url: {}, key from: {}",
            config.api_url, config.api_key_env
        );

        Ok(Self {
            client,
            config: config.clone(),
            api_key: None,
        })
    }

    /// Use an explicit key instead of reading the environment
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn resolve_api_key(&self) -> Result<String, BackendError> {
        let key = match &self.api_key {
            Some(key) => Some(key.clone()),
            None => env::var(&self.config.api_key_env).ok(),
        };
        key.filter(|k| !k.trim().is_empty())
            .ok_or_else(|| BackendError::MissingCredential {
                var: self.config.api_key_env.clone(),
            })
    }

    fn options(&self) -> GenerationOptions {
        GenerationOptions {
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }
}

#[async_trait]
impl Backend for HostedBackend {
    async fn send(&self, context: &AssembledContext, model: &str) -> Result<String, BackendError> {
        let api_key = self.resolve_api_key()?;
        let options = self.options();

        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: PERSONA.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: render_body(context),
                },
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.api_url.trim_end_matches('/')
        );
        debug!("Calling hosted API at: {} with model {}", url, model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .header("X-Title", APP_TITLE)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(BackendError::EmptyCompletion)
    }

    fn preflight(&self) -> Result<(), BackendError> {
        self.resolve_api_key().map(|_| ())
    }

    fn name(&self) -> &'static str {
        "hosted"
    }
}
