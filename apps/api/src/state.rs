use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::{GenerationParams, TextGenerator};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// `None` when the local model failed to load; generation then answers 503.
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub params: GenerationParams,
}
