//! Axum route handlers for contract drafting.

use std::time::Instant;

use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::contract::models::{ContractMetadata, ContractRequest, ContractResponse};
use crate::contract::prompts::{build_prompt, clean_output};
use crate::errors::{AppError, AppJson};
use crate::state::AppState;

/// GET /
///
/// Liveness/status: which provider and model this instance serves, and whether a
/// generator is ready.
pub async fn handle_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "JurisFlow AI Engine is running",
        "model": state.config.model_name,
        "provider": state.config.provider,
        "model_loaded": state.generator.is_some(),
    }))
}

/// POST /generate-contract
///
/// Validates the request, builds the drafting prompt, calls the configured provider
/// once, and returns the draft with any echoed prompt removed.
pub async fn handle_generate_contract(
    State(state): State<AppState>,
    AppJson(request): AppJson<ContractRequest>,
) -> Result<Json<ContractResponse>, AppError> {
    request.validate()?;

    let generator = state.generator.as_ref().ok_or(AppError::ModelUnavailable)?;

    let request_id = Uuid::new_v4();
    let prompt = build_prompt(&request);

    let start = Instant::now();
    let generated = generator.generate(&prompt, &state.params).await?;
    let elapsed = start.elapsed().as_secs_f64();

    let contract_draft = clean_output(&generated, &prompt);

    info!(
        %request_id,
        provider = %generator.kind(),
        contract_type = %request.contract_type,
        elapsed_secs = elapsed,
        draft_chars = contract_draft.len(),
        "contract generated"
    );

    Ok(Json(ContractResponse {
        status: "success",
        generation_time: format!("{elapsed:.2}s"),
        contract_draft,
        metadata: ContractMetadata {
            contract_type: request.contract_type,
            jurisdiction: request.jurisdiction,
            model: generator.model().to_string(),
            provider: generator.kind(),
            request_id,
        },
    }))
}
