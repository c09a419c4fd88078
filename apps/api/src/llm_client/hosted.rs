//! Hosted inference backend (Hugging Face Inference API request/response shape).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{join_url, GenerationParams, LlmError, ProviderKind, TextGenerator};

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    temperature: f32,
    do_sample: bool,
}

/// The endpoint answers with a list for text-generation models and a bare object for
/// some task-specific deployments.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Batch(Vec<GeneratedText>),
    Single(GeneratedText),
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
struct InferenceError {
    error: String,
}

impl InferenceResponse {
    fn into_text(self) -> Option<String> {
        match self {
            Self::Batch(items) => items.into_iter().next().map(|g| g.generated_text),
            Self::Single(g) => Some(g.generated_text),
        }
    }
}

#[derive(Clone)]
pub struct HostedClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    model: String,
}

impl HostedClient {
    pub fn new(client: Client, base_url: String, api_token: Option<String>, model: String) -> Self {
        Self {
            client,
            base_url,
            api_token,
            model,
        }
    }
}

#[async_trait]
impl TextGenerator for HostedClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Hosted
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        let token = self
            .api_token
            .as_deref()
            .ok_or(LlmError::MissingCredential("HF_API_TOKEN"))?;

        let body = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                max_new_tokens: params.max_length,
                temperature: params.temperature,
                do_sample: params.do_sample,
            },
        };

        let response = self
            .client
            .post(join_url(&self.base_url, &self.model))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<InferenceError>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        // A 200 can still carry `{"error": ...}` while a model is warming up.
        if let Ok(err) = serde_json::from_str::<InferenceError>(&text) {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: err.error,
            });
        }

        let parsed: InferenceResponse = serde_json::from_str(&text)?;
        let generated = parsed.into_text().ok_or(LlmError::EmptyContent)?;

        debug!(
            model = %self.model,
            chars = generated.len(),
            "hosted inference call succeeded"
        );

        if generated.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "MBZUAI/LaMini-GPT-124M";

    fn client_for(server: &MockServer, token: Option<&str>) -> HostedClient {
        HostedClient::new(
            Client::new(),
            server.uri(),
            token.map(String::from),
            MODEL.to_string(),
        )
    }

    #[tokio::test]
    async fn test_returns_first_generated_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/{MODEL}")))
            .and(header("authorization", "Bearer hf_test"))
            .and(body_partial_json(json!({
                "inputs": "Draft an NDA.",
                "parameters": {"max_new_tokens": 800, "do_sample": true}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"generated_text": "Draft an NDA. MUTUAL NON-DISCLOSURE AGREEMENT"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server, Some("hf_test"))
            .generate("Draft an NDA.", &GenerationParams::default())
            .await
            .unwrap();

        assert_eq!(text, "Draft an NDA. MUTUAL NON-DISCLOSURE AGREEMENT");
    }

    #[tokio::test]
    async fn test_accepts_single_object_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"generated_text": "AGREEMENT"})),
            )
            .mount(&server)
            .await;

        let text = client_for(&server, Some("hf_test"))
            .generate("p", &GenerationParams::default())
            .await
            .unwrap();

        assert_eq!(text, "AGREEMENT");
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_calling_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .generate("p", &GenerationParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::MissingCredential("HF_API_TOKEN")));
    }

    #[tokio::test]
    async fn test_upstream_error_message_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(503)
                    .set_body_json(json!({"error": "Model is currently loading"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server, Some("hf_test"))
            .generate("p", &GenerationParams::default())
            .await
            .unwrap_err();

        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "Model is currently loading");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_batch_is_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("hf_test"))
            .generate("p", &GenerationParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::EmptyContent));
    }
}
