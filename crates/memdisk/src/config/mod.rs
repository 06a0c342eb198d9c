use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{MemdiskError, Result};

/// Main configuration structure for MemDisk
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Where persisted disks live
    #[serde(default)]
    pub storage: StorageConfig,
    /// Context assembly limits
    #[serde(default)]
    pub context: ContextConfig,
    /// Text-generation backend used to answer queries
    #[serde(default)]
    pub backend: BackendConfig,
    /// Relevance classifier settings
    #[serde(default)]
    pub routing: RoutingConfig,
    /// HTTP API configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Disk storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory containing `.dsk` files
    #[serde(default = "default_disk_dir")]
    pub disk_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            disk_dir: default_disk_dir(),
        }
    }
}

fn default_disk_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".memdisk").join("disks"))
        .unwrap_or_else(|| PathBuf::from(".memdisk/disks"))
}

/// Context assembly configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContextConfig {
    /// Per-chunk character budget; larger disks are cut to a preview
    #[serde(default = "default_char_budget")]
    pub char_budget: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            char_budget: default_char_budget(),
        }
    }
}

fn default_char_budget() -> usize {
    12_000
}

/// Which backend answers queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Local model server (Ollama-compatible)
    #[default]
    #[serde(alias = "ollama")]
    Local,
    /// Local backend without a live model; echoes the prompt
    Mock,
    /// Hosted OpenAI-compatible chat completions API
    #[serde(alias = "openrouter")]
    Hosted,
}

impl FromStr for BackendMode {
    type Err = MemdiskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" | "ollama" => Ok(BackendMode::Local),
            "mock" => Ok(BackendMode::Mock),
            "hosted" | "openrouter" => Ok(BackendMode::Hosted),
            other => Err(MemdiskError::Config(format!(
                "Unknown backend mode '{other}' (expected local, ollama, mock, hosted or openrouter)"
            ))),
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendMode::Local => "local",
            BackendMode::Mock => "mock",
            BackendMode::Hosted => "hosted",
        };
        f.write_str(name)
    }
}

/// Backend selection and per-backend settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BackendConfig {
    /// Active backend for this deployment
    #[serde(default)]
    pub mode: BackendMode,
    /// Model id used at startup; falls back to the active backend's model
    #[serde(default)]
    pub default_model: Option<String>,
    /// Local model server settings
    #[serde(default)]
    pub local: LocalBackendConfig,
    /// Hosted API settings
    #[serde(default)]
    pub hosted: HostedBackendConfig,
}

impl BackendConfig {
    /// Model id the dispatcher starts with
    pub fn initial_model(&self) -> String {
        if let Some(model) = self.default_model.as_ref().filter(|m| !m.trim().is_empty()) {
            return model.clone();
        }
        match self.mode {
            BackendMode::Local | BackendMode::Mock => self.local.model.clone(),
            BackendMode::Hosted => self.hosted.model.clone(),
        }
    }
}

/// Local model server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalBackendConfig {
    /// Base URL of the model server
    #[serde(default = "default_local_endpoint")]
    pub endpoint: String,
    /// Model name known to the server
    #[serde(default = "default_local_model")]
    pub model: String,
    /// Maximum tokens to generate (`num_predict`)
    #[serde(default = "default_local_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default = "default_local_temperature")]
    pub temperature: f32,
    /// Optional request timeout; unset means wait indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for LocalBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_local_endpoint(),
            model: default_local_model(),
            max_tokens: default_local_max_tokens(),
            temperature: default_local_temperature(),
            timeout_secs: None,
        }
    }
}

fn default_local_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_local_model() -> String {
    "gemma:2b".to_string()
}

fn default_local_max_tokens() -> u32 {
    256
}

fn default_local_temperature() -> f32 {
    0.6
}

/// Hosted chat completions API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostedBackendConfig {
    /// API base URL (`/chat/completions` is appended)
    #[serde(default = "default_hosted_api_url")]
    pub api_url: String,
    /// Environment variable holding the API key
    #[serde(default = "default_hosted_api_key_env")]
    pub api_key_env: String,
    /// Model identifier for the hosted API
    #[serde(default = "default_hosted_model")]
    pub model: String,
    /// Maximum tokens in the completion
    #[serde(default = "default_hosted_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default = "default_hosted_temperature")]
    pub temperature: f32,
    /// Optional request timeout; unset means wait indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for HostedBackendConfig {
    fn default() -> Self {
        Self {
            api_url: default_hosted_api_url(),
            api_key_env: default_hosted_api_key_env(),
            model: default_hosted_model(),
            max_tokens: default_hosted_max_tokens(),
            temperature: default_hosted_temperature(),
            timeout_secs: None,
        }
    }
}

fn default_hosted_api_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_hosted_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_hosted_model() -> String {
    "openrouter/auto".to_string()
}

fn default_hosted_max_tokens() -> u32 {
    1024
}

fn default_hosted_temperature() -> f32 {
    0.7
}

/// Relevance classifier configuration
///
/// The classifier always talks to the local model server; in mock mode it
/// receives the mock echo and falls back to every loaded disk.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutingConfig {
    /// Model used for disk selection (defaults to the local backend model)
    #[serde(default)]
    pub model: Option<String>,
    /// Maximum tokens for the selection answer
    #[serde(default = "default_routing_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature for selection
    #[serde(default = "default_routing_temperature")]
    pub temperature: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: default_routing_max_tokens(),
            temperature: default_routing_temperature(),
        }
    }
}

fn default_routing_max_tokens() -> u32 {
    256
}

fn default_routing_temperature() -> f32 {
    0.4
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

impl Config {
    /// Load configuration from an explicit path, or from the first default
    /// location that exists, or fall back to defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Config> {
        if let Some(path) = config_path {
            tracing::info!("Loading config from: {}", path.display());
            return Self::from_file(path);
        }

        let default_paths = [
            dirs::home_dir().map(|h| h.join(".memdisk").join("config.toml")),
            dirs::config_dir().map(|c| c.join("memdisk").join("config.toml")),
            Some(PathBuf::from("config.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    fn from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MemdiskError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content)
            .map_err(|e| MemdiskError::Config(format!("Failed to parse config: {e}")))
    }

    /// Apply environment variable overrides on top of the file configuration.
    ///
    /// `lookup` is usually `|key| std::env::var(key).ok()`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("MEMDISK_DISK_DIR") {
            self.storage.disk_dir = PathBuf::from(dir);
        }
        if let Some(budget) = lookup("MEMDISK_CONTEXT_BUDGET") {
            self.context.char_budget = parse_env("MEMDISK_CONTEXT_BUDGET", &budget)?;
        }
        if let Some(mode) = lookup("MEMDISK_LLM_MODE") {
            self.backend.mode = mode.parse()?;
        }
        if let Some(url) = lookup("LOCAL_LLM_URL") {
            self.backend.local.endpoint = url;
        }
        if let Some(model) = lookup("LOCAL_LLM_MODEL") {
            self.backend.local.model = model;
        }
        if let Some(max_tokens) = lookup("MEMDISK_LLM_MAX_TOKENS") {
            self.backend.local.max_tokens = parse_env("MEMDISK_LLM_MAX_TOKENS", &max_tokens)?;
        }
        if let Some(temp) = lookup("MEMDISK_LLM_TEMP") {
            self.backend.local.temperature = parse_env("MEMDISK_LLM_TEMP", &temp)?;
        }
        if let Some(url) = lookup("MEMDISK_HOSTED_URL") {
            self.backend.hosted.api_url = url;
        }
        if let Some(model) = lookup("MEMDISK_HOSTED_MODEL") {
            self.backend.hosted.model = model;
        }
        if let Some(addr) = lookup("MEMDISK_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        Ok(())
    }

    /// Model used by the relevance classifier
    pub fn routing_model(&self) -> String {
        self.routing
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.backend.local.model.clone())
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| MemdiskError::Config(format!("Invalid value for {key}: '{value}'")))
}

/// Load a `.env` file into the process environment.
///
/// The path comes from `MEMDISK_ENV_FILE` (default `./.env`). Variables that are
/// already set are left untouched.
pub fn load_env_file() {
    let path = std::env::var("MEMDISK_ENV_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".env"));

    if !path.exists() {
        return;
    }

    match dotenv::from_path(&path) {
        Ok(()) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) => tracing::warn!("Failed to load {}: {}", path.display(), e),
    }
}
