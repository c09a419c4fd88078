//! LLM Client — the single point of entry for all text-generation calls in JurisFlow.
//!
//! Handlers only see `dyn TextGenerator`. Which backend sits behind it is decided once,
//! at startup, from `Config::provider`.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

pub mod chat;
pub mod hosted;
pub mod local;
pub mod prompts;
#[cfg(feature = "local")]
mod sampling;

pub use chat::ChatClient;
pub use hosted::HostedClient;
pub use local::LocalModel;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0} is not configured")]
    MissingCredential(&'static str),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Local inference failed: {0}")]
    Inference(String),
}

/// Which backend performs generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Model weights loaded into this process.
    Local,
    /// Hugging Face style hosted inference endpoint.
    Hosted,
    /// OpenAI style chat-completion API.
    Chat,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Hosted => "hosted",
            Self::Chat => "chat",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "hosted" | "huggingface" | "hf" => Ok(Self::Hosted),
            "chat" | "openai" => Ok(Self::Chat),
            other => anyhow::bail!("Unknown PROVIDER '{other}' (expected local, hosted or chat)"),
        }
    }
}

/// Sampling controls shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Total sequence length for the local model; new-token budget for HTTP backends.
    pub max_length: u32,
    pub temperature: f32,
    pub do_sample: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: 800,
            temperature: 0.7,
            do_sample: true,
        }
    }
}

impl GenerationParams {
    /// The local model cannot attend past `local::MAX_POSITIONS`, so its length is capped.
    pub fn from_config(config: &Config) -> Self {
        let max_length = match config.provider {
            ProviderKind::Local if config.max_length > local::MAX_POSITIONS => {
                warn!(
                    "MAX_LENGTH {} exceeds the local model's {} positions; capping",
                    config.max_length,
                    local::MAX_POSITIONS
                );
                local::MAX_POSITIONS
            }
            _ => config.max_length,
        };

        Self {
            max_length,
            temperature: config.temperature,
            ..Self::default()
        }
    }
}

/// A text-generation backend. Implement this to add a provider without touching
/// the handler code.
///
/// Carried in `AppState` as `Arc<dyn TextGenerator>`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier reported in response metadata.
    fn model(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Generates text for `prompt`. The output may contain the prompt itself.
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError>;
}

/// Builds the HTTP client shared by the hosted and chat backends.
pub fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Constructs the configured backend.
///
/// Returns `Ok(None)` when the local model fails to load; the service still starts
/// and answers generation requests with 503.
pub async fn build_generator(config: &Config) -> anyhow::Result<Option<Arc<dyn TextGenerator>>> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let generator: Arc<dyn TextGenerator> = match config.provider {
        ProviderKind::Local => {
            info!("Loading AI model: {}...", config.model_name);
            let dir = config.local_model_dir.clone();
            let name = config.model_name.clone();
            let loaded = tokio::task::spawn_blocking(move || LocalModel::load(&dir, name)).await?;
            match loaded {
                Ok(model) => {
                    info!("Model loaded successfully");
                    Arc::new(model)
                }
                Err(e) => {
                    warn!("Error loading model: {e:#}");
                    return Ok(None);
                }
            }
        }
        ProviderKind::Hosted => {
            if config.hf_api_token.is_none() {
                warn!("HF_API_TOKEN is not set; generation requests will fail");
            }
            Arc::new(HostedClient::new(
                http_client(timeout)?,
                config.hf_api_url.clone(),
                config.hf_api_token.clone(),
                config.model_name.clone(),
            ))
        }
        ProviderKind::Chat => {
            if config.openai_api_key.is_none() {
                warn!("OPENAI_API_KEY is not set; generation requests will fail");
            }
            Arc::new(ChatClient::new(
                http_client(timeout)?,
                config.openai_base_url.clone(),
                config.openai_api_key.clone(),
                config.model_name.clone(),
            ))
        }
    };

    Ok(Some(generator))
}

/// Joins a base URL and a path segment without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
