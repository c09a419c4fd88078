//! In-process causal language model backend.
//!
//! Loads an ONNX export of a decoder-only model (LaMini-GPT-124M by default) from a
//! directory containing `model.onnx` and `tokenizer.json`, then generates by repeatedly
//! running the full sequence and sampling the next token. Requires the `local` feature;
//! without it `LocalModel::load` always fails and the service reports the model as
//! unavailable.

use std::path::Path;

use async_trait::async_trait;

use super::{GenerationParams, LlmError, ProviderKind, TextGenerator};

/// Position-embedding limit of GPT-2 family models; longer sequences fail inside the graph.
pub const MAX_POSITIONS: u32 = 1024;

/// Re-attaches the caller's prompt to a decoded continuation, so an echoed prompt is
/// always byte-identical even when its tokens were truncated to fit the window.
#[cfg(any(feature = "local", test))]
fn with_prompt(prompt: &str, continuation: &str) -> String {
    format!("{prompt}{continuation}")
}

pub struct LocalModel {
    name: String,
    #[cfg(feature = "local")]
    runtime: std::sync::Arc<std::sync::Mutex<onnx::CausalLm>>,
}

impl LocalModel {
    #[cfg(feature = "local")]
    pub fn load(model_dir: &Path, name: String) -> anyhow::Result<Self> {
        let runtime = onnx::CausalLm::load(model_dir)?;
        Ok(Self {
            name,
            runtime: std::sync::Arc::new(std::sync::Mutex::new(runtime)),
        })
    }

    #[cfg(not(feature = "local"))]
    pub fn load(model_dir: &Path, name: String) -> anyhow::Result<Self> {
        anyhow::bail!(
            "cannot load {name} from {}: built without the `local` feature",
            model_dir.display()
        )
    }

    /// The ONNX session is not reentrant, so runs serialize on the mutex inside the
    /// blocking pool.
    #[cfg(feature = "local")]
    async fn run(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        let runtime = std::sync::Arc::clone(&self.runtime);
        let prompt = prompt.to_string();
        let params = *params;

        tokio::task::spawn_blocking(move || {
            let mut lm = runtime
                .lock()
                .map_err(|_| LlmError::Inference("model lock poisoned".to_string()))?;
            lm.generate(&prompt, &params)
                .map_err(|e| LlmError::Inference(format!("{e:#}")))
        })
        .await
        .map_err(|e| LlmError::Inference(e.to_string()))?
    }

    #[cfg(not(feature = "local"))]
    async fn run(&self, _prompt: &str, _params: &GenerationParams) -> Result<String, LlmError> {
        Err(LlmError::Inference(
            "built without the `local` feature".to_string(),
        ))
    }
}

#[async_trait]
impl TextGenerator for LocalModel {
    fn model(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        let text = self.run(prompt, params).await?;
        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text)
    }
}

#[cfg(feature = "local")]
mod onnx {
    use std::path::Path;

    use ort::session::Session;
    use ort::value::Tensor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokenizers::Tokenizer;
    use tracing::{debug, info};

    use crate::llm_client::sampling;
    use crate::llm_client::GenerationParams;

    /// End-of-text markers tried in order when resolving the stop token.
    const EOS_TOKENS: &[&str] = &["<|endoftext|>", "</s>", "<eos>"];

    pub struct CausalLm {
        session: Session,
        tokenizer: Tokenizer,
        eos_id: Option<u32>,
    }

    impl CausalLm {
        pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
            anyhow::ensure!(
                tokenizer_path.exists(),
                "tokenizer.json not found in {model_dir:?}"
            );

            let session = Session::builder()?.commit_from_file(&model_path)?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;

            let eos_id = EOS_TOKENS.iter().find_map(|t| tokenizer.token_to_id(t));

            info!(model = %model_path.display(), ?eos_id, "loaded causal language model");
            Ok(Self {
                session,
                tokenizer,
                eos_id,
            })
        }

        /// Returns the prompt plus the decoded continuation.
        pub fn generate(
            &mut self,
            prompt: &str,
            params: &GenerationParams,
        ) -> anyhow::Result<String> {
            let encoding = self
                .tokenizer
                .encode(prompt, false)
                .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

            let max_len = params.max_length.clamp(2, super::MAX_POSITIONS) as usize;
            let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
            anyhow::ensure!(!ids.is_empty(), "prompt produced no tokens");

            // Leave room for at least one generated token.
            if ids.len() >= max_len {
                ids.truncate(max_len - 1);
            }
            let prompt_len = ids.len();

            let mut rng = StdRng::from_entropy();
            while ids.len() < max_len {
                let logits = self.last_logits(&ids)?;
                let next =
                    sampling::next_token(&logits, params.temperature, params.do_sample, &mut rng)
                        .ok_or_else(|| anyhow::anyhow!("model returned empty logits"))?;

                if self.eos_id == Some(next as u32) {
                    break;
                }
                ids.push(next as i64);
            }

            debug!(
                prompt_tokens = prompt_len,
                generated_tokens = ids.len() - prompt_len,
                "local generation finished"
            );

            let generated: Vec<u32> = ids[prompt_len..].iter().map(|&id| id as u32).collect();
            let continuation = self
                .tokenizer
                .decode(&generated, true)
                .map_err(|e| anyhow::anyhow!("detokenize: {e}"))?;
            Ok(super::with_prompt(prompt, &continuation))
        }

        /// Runs the whole sequence and returns the logits row for its last position.
        fn last_logits(&mut self, ids: &[i64]) -> anyhow::Result<Vec<f32>> {
            let seq_len = ids.len();
            let shape = [1i64, seq_len as i64];

            let ids_tensor = Tensor::from_array((shape, ids.to_vec().into_boxed_slice()))?;
            let mask_tensor = Tensor::from_array((shape, vec![1i64; seq_len].into_boxed_slice()))?;

            let outputs = self.session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
            ])?;

            // Logits: [1, seq_len, vocab].
            let (output_shape, output_data) = outputs[0].try_extract_tensor::<f32>()?;
            let dims: &[i64] = output_shape;
            anyhow::ensure!(
                dims.len() == 3 && dims[0] == 1 && dims[1] > 0,
                "unexpected logits shape: {dims:?}"
            );

            let positions = dims[1] as usize;
            let vocab = dims[2] as usize;
            let start = (positions - 1) * vocab;
            Ok(output_data[start..start + vocab].to_vec())
        }
    }
}
