use candle_core::{Device, Result as CandleResult, Tensor};
use candle_transformers::models::quantized_qwen3 as candle_qwen3;
use std::sync::Arc;

use super::capabilities::{LanguageModelContext, TextGenerationModel};
use crate::error::{PipelineError, Result};
use crate::loaders::{GenerationConfig, GenerationConfigLoader, GgufModelLoader, Hub};

/// Where to fetch a quantized Qwen3 model from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qwen3Source {
    /// Repository holding the GGUF weights.
    pub repo: String,
    /// GGUF file inside `repo`.
    pub weights_file: String,
    /// Repository holding `tokenizer.json` and `generation_config.json`.
    pub tokenizer_repo: String,
}

impl Default for Qwen3Source {
    fn default() -> Self {
        Self {
            repo: "unsloth/Qwen3-0.6B-GGUF".into(),
            weights_file: "Qwen3-0.6B-Q4_K_M.gguf".into(),
            tokenizer_repo: "Qwen/Qwen3-0.6B".into(),
        }
    }
}

impl std::fmt::Display for Qwen3Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.repo, self.weights_file)
    }
}

impl crate::pipelines::cache::ModelOptions for Qwen3Source {
    fn cache_key(&self) -> String {
        format!("{self}+{}", self.tokenizer_repo)
    }
}

#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub max_seq_len: usize,
    pub device: Device,
}

/// Quantized Qwen3 loaded from GGUF.
pub struct Qwen3 {
    weights: Arc<candle_qwen3::ModelWeights>,
    info: ModelInfo,
    generation_config: GenerationConfig,
}

impl Qwen3 {
    pub(crate) fn from_hub(hub: &Hub, source: &Qwen3Source, device: &Device) -> Result<Self> {
        let model_loader = GgufModelLoader::new(&source.repo, &source.weights_file);
        let (mut file, content) = model_loader.load(hub)?;

        let generation_config =
            GenerationConfigLoader::new(&source.tokenizer_repo, "generation_config.json")
                .load(hub)?;

        let architecture = content
            .metadata
            .get("general.architecture")
            .map(|v| v.to_string())
            .transpose()?
            .cloned()
            .unwrap_or_default();
        if architecture != "qwen3" {
            return Err(PipelineError::Unexpected(format!(
                "'{source}' is a '{architecture}' model, expected 'qwen3'"
            )));
        }

        let max_seq_len = content
            .metadata
            .get("qwen3.context_length")
            .ok_or_else(|| {
                PipelineError::Unexpected(
                    "Missing 'qwen3.context_length' in Qwen3 model metadata".to_string(),
                )
            })?
            .to_u32()? as usize;
        let info = ModelInfo {
            max_seq_len,
            device: device.clone(),
        };

        tracing::info!(
            model = %source,
            context = info.max_seq_len,
            "loaded qwen3 weights"
        );

        let weights = Arc::new(candle_qwen3::ModelWeights::from_gguf(
            content, &mut file, device,
        )?);

        Ok(Self {
            weights,
            info,
            generation_config,
        })
    }
}

pub struct Context {
    weights: candle_qwen3::ModelWeights,
    position: usize,
}

impl Context {
    pub fn new(weights: Arc<candle_qwen3::ModelWeights>) -> Self {
        let mut weights = (*weights).clone();
        weights.clear_kv_cache();
        Self {
            weights,
            position: 0,
        }
    }
}

impl LanguageModelContext for Context {
    fn generate(&mut self, input: &Tensor) -> CandleResult<Tensor> {
        let seq_len = input.dim(1)?;
        let logits = self.weights.forward(input, self.position)?;
        self.position += seq_len;
        Ok(logits)
    }
}

impl TextGenerationModel for Qwen3 {
    type Context = Context;

    fn get_eos_tokens(&self) -> Vec<u32> {
        self.generation_config
            .eos_token_ids
            .iter()
            .map(|&id| id as u32)
            .collect()
    }

    fn get_max_seq_len(&self) -> usize {
        self.info.max_seq_len
    }

    fn get_generation_config(&self) -> &GenerationConfig {
        &self.generation_config
    }

    fn new_context(&self) -> Context {
        Context::new(self.weights.clone())
    }

    fn device(&self) -> &Device {
        &self.info.device
    }
}
