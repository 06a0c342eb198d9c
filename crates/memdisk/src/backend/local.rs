//! Local model server backend
//!
//! Talks to an Ollama-compatible `/api/generate` endpoint with streaming
//! enabled and concatenates the streamed fragments. In mock mode no request
//! is made; the client echoes the tail of the prompt instead.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::backend::prompts::render_local_prompt;
use crate::backend::types::{BackendError, GenerationOptions, LocalMode};
use crate::backend::{Backend, TextGenerator};
use crate::config::LocalBackendConfig;
use crate::context::AssembledContext;

/// Characters of the prompt echoed back in mock mode
pub const MOCK_SUFFIX_CHARS: usize = 280;

const MOCK_PREFIX: &str = "[[MOCK LLM]]";

/// Client for a local model server
#[derive(Debug, Clone)]
pub struct LocalBackend {
    client: Client,
    generate_url: Url,
    mode: LocalMode,
    options: GenerationOptions,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Debug, Serialize)]
struct SamplingOptions {
    temperature: f32,
    num_predict: u32,
}

/// One line of the streamed response
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl LocalBackend {
    pub fn new(config: &LocalBackendConfig, mode: LocalMode) -> Result<Self, BackendError> {
        let generate_url = Url::parse(&config.endpoint)
            .and_then(|base| base.join("/api/generate"))
            .map_err(|e| {
                BackendError::Config(format!(
                    "Invalid local endpoint '{}': {}",
                    config.endpoint, e
                ))
            })?;

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;

        info!(
            "LocalBackend initialized ({:?}) with endpoint: {}",
            mode, generate_url
        );

        Ok(Self {
            client,
            generate_url,
            mode,
            options: GenerationOptions {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
        })
    }

    pub fn mode(&self) -> LocalMode {
        self.mode
    }

    /// Sampling limits used when answering queries
    pub fn options(&self) -> GenerationOptions {
        self.options
    }

    async fn call_generate(
        &self,
        prompt: &str,
        model: &str,
        options: &GenerationOptions,
    ) -> Result<String, BackendError> {
        let request = GenerateRequest {
            model,
            prompt,
            stream: true,
            options: SamplingOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        debug!("Calling local model {} at {}", model, self.generate_url);

        let response = self
            .client
            .post(self.generate_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let mut stream = response.bytes_stream();
        let mut collector = StreamCollector::default();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| BackendError::Request(e.to_string()))?;
            collector.push(&chunk)?;
        }
        collector.finish()
    }
}

#[async_trait]
impl TextGenerator for LocalBackend {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        options: &GenerationOptions,
    ) -> Result<String, BackendError> {
        if prompt.is_empty() {
            return Err(BackendError::EmptyPrompt);
        }
        match self.mode {
            LocalMode::Mock => Ok(mock_response(prompt)),
            LocalMode::Live => self.call_generate(prompt, model, options).await,
        }
    }

    fn name(&self) -> &'static str {
        match self.mode {
            LocalMode::Live => "local",
            LocalMode::Mock => "mock",
        }
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn send(&self, context: &AssembledContext, model: &str) -> Result<String, BackendError> {
        let prompt = render_local_prompt(context);
        self.generate(&prompt, model, &self.options).await
    }

    fn name(&self) -> &'static str {
        TextGenerator::name(self)
    }
}

/// Deterministic stand-in answer: the prompt's tail with whitespace runs
/// collapsed.
pub fn mock_response(prompt: &str) -> String {
    let total = prompt.chars().count();
    let tail: String = prompt
        .chars()
        .skip(total.saturating_sub(MOCK_SUFFIX_CHARS))
        .collect();

    let mut collapsed = String::with_capacity(tail.len());
    let mut in_whitespace = false;
    for c in tail.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                collapsed.push(' ');
            }
            in_whitespace = true;
        } else {
            collapsed.push(c);
            in_whitespace = false;
        }
    }

    format!("{MOCK_PREFIX} {collapsed}")
}

/// Reassembles newline-delimited JSON from arbitrarily split byte chunks
#[derive(Debug, Default)]
pub(crate) struct StreamCollector {
    pending: Vec<u8>,
    output: String,
}

impl StreamCollector {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Result<(), BackendError> {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.consume_line(&line)?;
        }
        Ok(())
    }

    pub(crate) fn finish(mut self) -> Result<String, BackendError> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.consume_line(&rest)?;
        }
        Ok(self.output.trim().to_string())
    }

    fn consume_line(&mut self, raw: &[u8]) -> Result<(), BackendError> {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim();
        if line.is_empty() {
            return Ok(());
        }

        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(value) => {
                // Valid JSON that is not a chunk object contributes nothing
                let Ok(chunk) = serde_json::from_value::<GenerateChunk>(value) else {
                    return Ok(());
                };
                if let Some(error) = chunk.error {
                    return Err(BackendError::Api {
                        status: 200,
                        body: error,
                    });
                }
                if let Some(fragment) = chunk.response {
                    self.output.push_str(&fragment);
                }
            }
            Err(_) => self.output.push_str(line),
        }
        Ok(())
    }
}
