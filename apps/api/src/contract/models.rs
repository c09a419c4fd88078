use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::ProviderKind;

/// Body of `POST /generate-contract`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractRequest {
    pub contract_type: String,
    pub client_name: String,
    pub company_name: String,
    pub jurisdiction: String,
    #[serde(default)]
    pub extra_clauses: String,
}

impl ContractRequest {
    /// Rejects blank required fields. Missing fields never get this far; the JSON
    /// extractor refuses them.
    pub fn validate(&self) -> Result<(), AppError> {
        let required = [
            ("contract_type", &self.contract_type),
            ("client_name", &self.client_name),
            ("company_name", &self.company_name),
            ("jurisdiction", &self.jurisdiction),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{field} cannot be empty")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ContractMetadata {
    #[serde(rename = "type")]
    pub contract_type: String,
    pub jurisdiction: String,
    pub model: String,
    pub provider: ProviderKind,
    pub request_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ContractResponse {
    pub status: &'static str,
    /// Seconds with two decimals and an `s` suffix, e.g. `"3.47s"`.
    pub generation_time: String,
    pub contract_draft: String,
    pub metadata: ContractMetadata,
}
