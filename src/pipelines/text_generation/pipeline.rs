use candle_core::Tensor;
use std::sync::Arc;
use tokenizers::Tokenizer;

use super::params::{
    apply_no_repeat_ngram, apply_repeat_penalty, initialize_logits_processor, GenerationParams,
};
use crate::config::Task;
use crate::error::{PipelineError, Result};
use crate::models::capabilities::{LanguageModelContext, TextGenerationModel};
use crate::pipelines::stats::GenerationStats;
use crate::pipelines::Pipeline;

/// Output from [`TextGenerationPipeline::run`].
#[derive(Debug, Clone)]
pub struct Output {
    /// Decoded prompt plus continuation, special tokens removed.
    pub text: String,
    /// Execution statistics.
    pub stats: GenerationStats,
}

/// Continues a prompt by sampling from a causal language model.
///
/// Construct with [`TextGenerationPipelineBuilder`](super::TextGenerationPipelineBuilder).
pub struct TextGenerationPipeline<M: TextGenerationModel> {
    pub(crate) model: Arc<M>,
    pub(crate) tokenizer: Tokenizer,
    pub(crate) params: GenerationParams,
}

impl<M: TextGenerationModel> TextGenerationPipeline<M> {
    pub(crate) fn new(model: Arc<M>, tokenizer: Tokenizer, params: GenerationParams) -> Self {
        Self {
            model,
            tokenizer,
            params,
        }
    }

    /// Resolved sampling parameters.
    pub fn generation_params(&self) -> &GenerationParams {
        &self.params
    }

    /// Generate until EOS or until prompt plus continuation reaches `max_length` tokens.
    ///
    /// At least one token is always generated, even when the prompt alone is longer
    /// than `max_length`.
    pub fn run(&self, prompt: &str, max_length: usize) -> Result<Output> {
        let encoding = self.tokenizer.encode(prompt, true).map_err(|e| {
            PipelineError::Tokenization(format!(
                "Tokenization failed on '{}': {}",
                prompt.chars().take(50).collect::<String>(),
                e
            ))
        })?;
        let prompt_tokens = encoding.get_ids().to_vec();
        if prompt_tokens.is_empty() {
            return Err(PipelineError::Tokenization(
                "Prompt produced no tokens".to_string(),
            ));
        }

        let context_room = self
            .model
            .get_max_seq_len()
            .saturating_sub(prompt_tokens.len());
        if context_room == 0 {
            return Err(PipelineError::Tokenization(format!(
                "Prompt is {} tokens, the model accepts at most {}",
                prompt_tokens.len(),
                self.model.get_max_seq_len()
            )));
        }
        let budget = max_length
            .saturating_sub(prompt_tokens.len())
            .max(1)
            .min(context_room);

        let (generated, stats) = self.generate_tokens(&prompt_tokens, budget)?;

        let mut all_tokens = prompt_tokens;
        all_tokens.extend(generated);
        let text = self
            .tokenizer
            .decode(&all_tokens, /*skip_special_tokens=*/ true)
            .map_err(|e| PipelineError::Tokenization(format!("Decode error: {e}")))?;

        tracing::debug!(
            prompt_tokens = stats.prompt_tokens,
            generated = stats.tokens_generated,
            tokens_per_second = stats.tokens_per_second,
            "generation finished"
        );

        Ok(Output { text, stats })
    }

    /// Sample up to `budget` tokens after `prompt_tokens`. EOS tokens are not returned.
    fn generate_tokens(
        &self,
        prompt_tokens: &[u32],
        budget: usize,
    ) -> Result<(Vec<u32>, GenerationStats)> {
        let params = &self.params;
        let eos_tokens = self.model.get_eos_tokens();
        if eos_tokens.is_empty() {
            return Err(PipelineError::Unexpected(
                "No EOS tokens configured for model. Cannot determine when to stop.".to_string(),
            ));
        }

        let mut logits_processor = initialize_logits_processor(params);
        let mut context = self.model.new_context();
        let mut stats = GenerationStats::new();
        stats.set_prompt_tokens(prompt_tokens.len());

        let device = self.model.device();
        let mut sequence = prompt_tokens.to_vec();
        let mut generated: Vec<u32> = Vec::with_capacity(budget);

        // The whole prompt goes through in one forward pass, then one token per step.
        let mut input = Tensor::new(prompt_tokens, device)?.unsqueeze(0)?;
        while generated.len() < budget {
            let logits = context.generate(&input)?.squeeze(0)?;

            let logits = if params.no_repeat_ngram_size > 0 {
                apply_no_repeat_ngram(&logits, params.no_repeat_ngram_size, &sequence)?
            } else {
                logits
            };

            let start_at = generated.len().saturating_sub(params.repeat_last_n);
            let penalty_context = &generated[start_at..];
            let logits = if params.repeat_penalty <= 1. || penalty_context.is_empty() {
                logits
            } else {
                apply_repeat_penalty(&logits, params.repeat_penalty, penalty_context)?
            };

            let next_token = logits_processor.sample(&logits)?;
            if eos_tokens.contains(&next_token) {
                break;
            }
            stats.record_token();

            generated.push(next_token);
            sequence.push(next_token);
            input = Tensor::new(&[next_token], device)?.unsqueeze(0)?;
        }

        stats.finalize();
        Ok((generated, stats))
    }
}

impl<M> Pipeline for TextGenerationPipeline<M>
where
    M: TextGenerationModel + Send + Sync,
{
    fn task(&self) -> Task {
        Task::Generation
    }

    fn respond(&self, prompt: &str, max_length: usize) -> Result<String> {
        self.run(prompt, max_length).map(|output| output.text)
    }
}
