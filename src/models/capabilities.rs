//! Model capability traits.
//!
//! Pipelines only talk to models through these traits, so the decoding and scoring
//! logic is independent of the concrete architecture.

use candle_core::{Device, Tensor};

use crate::loaders::GenerationConfig;

// ============ Text generation ============

/// Per-call decoding state (KV cache and position).
pub trait LanguageModelContext: Send {
    /// Feed `input` (shape `[1, seq_len]`) and return logits for the last position.
    fn generate(&mut self, input: &Tensor) -> candle_core::Result<Tensor>;
}

/// Core trait for autoregressive text generation models.
pub trait TextGenerationModel {
    /// The decoding context for this model.
    type Context: LanguageModelContext;

    /// Token ids that end generation.
    fn get_eos_tokens(&self) -> Vec<u32>;

    /// Longest sequence the model accepts.
    fn get_max_seq_len(&self) -> usize;

    /// Sampling defaults shipped with the model.
    fn get_generation_config(&self) -> &GenerationConfig;

    /// Fresh decoding context with an empty cache.
    fn new_context(&self) -> Self::Context;

    /// Get the device this model runs on.
    fn device(&self) -> &Device;
}

// ============ Sequence classification ============

/// Trait for sequence classification models.
pub trait SequenceClassificationModel {
    /// Raw class logits, shape `[batch, num_labels]`.
    fn classify(&self, input_ids: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor>;

    /// Get the device this model runs on.
    fn device(&self) -> &Device;
}
