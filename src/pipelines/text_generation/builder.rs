use super::params::{GenerationOverrides, GenerationParams};
use super::pipeline::TextGenerationPipeline;
use crate::error::Result;
use crate::loaders::{Hub, TokenizerLoader};
use crate::models::capabilities::TextGenerationModel;
use crate::models::{Qwen3, Qwen3Source};
use crate::pipelines::cache::global_cache;
use crate::pipelines::utils::{build_cache_key, DeviceRequest};

/// Builder for constructing [`TextGenerationPipeline`] instances.
///
/// # Example
///
/// ```rust,no_run
/// use prompt_pipelines::loaders::Hub;
/// use prompt_pipelines::models::Qwen3Source;
/// use prompt_pipelines::pipelines::text_generation::TextGenerationPipelineBuilder;
///
/// # fn example(hub: &Hub) -> prompt_pipelines::error::Result<()> {
/// let pipeline = TextGenerationPipelineBuilder::qwen3(Qwen3Source::default())
///     .temperature(0.7)
///     .top_p(0.9)
///     .no_repeat_ngram_size(3)
///     .build(hub)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TextGenerationPipelineBuilder {
    source: Qwen3Source,
    overrides: GenerationOverrides,
    device_request: DeviceRequest,
}

impl TextGenerationPipelineBuilder {
    /// Create a builder for a quantized Qwen 3 model.
    pub fn qwen3(source: Qwen3Source) -> Self {
        Self {
            source,
            overrides: GenerationOverrides::default(),
            device_request: DeviceRequest::Cpu,
        }
    }

    /// Replace every override at once.
    pub fn overrides(mut self, overrides: GenerationOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Set sampling temperature. 0.0 = deterministic, higher = more random.
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.overrides.temperature = Some(temperature);
        self
    }

    /// Set penalty for repeating tokens. 1.0 = no penalty.
    pub fn repeat_penalty(mut self, repeat_penalty: f32) -> Self {
        self.overrides.repeat_penalty = Some(repeat_penalty);
        self
    }

    /// Set how many recent tokens to consider for repeat penalty.
    pub fn repeat_last_n(mut self, repeat_last_n: usize) -> Self {
        self.overrides.repeat_last_n = Some(repeat_last_n);
        self
    }

    /// Forbid any n-gram of this size from occurring twice. 0 disables.
    pub fn no_repeat_ngram_size(mut self, size: usize) -> Self {
        self.overrides.no_repeat_ngram_size = Some(size);
        self
    }

    /// Set random seed for reproducible generation.
    pub fn seed(mut self, seed: u64) -> Self {
        self.overrides.seed = Some(seed);
        self
    }

    /// Set nucleus sampling threshold (0.0-1.0).
    pub fn top_p(mut self, top_p: f64) -> Self {
        self.overrides.top_p = Some(top_p.clamp(0.0, 1.0));
        self
    }

    /// Only sample from the top k most likely tokens.
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.overrides.top_k = Some(top_k);
        self
    }

    /// Filter tokens below min_p * max_probability (0.0-1.0).
    pub fn min_p(mut self, min_p: f64) -> Self {
        self.overrides.min_p = Some(min_p.clamp(0.0, 1.0));
        self
    }

    /// Load on the given device.
    pub fn device(mut self, device_request: DeviceRequest) -> Self {
        self.device_request = device_request;
        self
    }

    /// Load on CPU.
    pub fn cpu(self) -> Self {
        self.device(DeviceRequest::Cpu)
    }

    /// Load on the CUDA device with ordinal `index`.
    pub fn cuda(self, index: usize) -> Self {
        self.device(DeviceRequest::Cuda(index))
    }

    /// Build the pipeline, downloading and loading the model if needed.
    pub fn build(self, hub: &Hub) -> Result<TextGenerationPipeline<Qwen3>> {
        let device = self.device_request.resolve()?;
        let cache_key = build_cache_key(&self.source, &device);

        let source = self.source;
        let model =
            global_cache().get_or_create(&cache_key, || Qwen3::from_hub(hub, &source, &device))?;

        let tokenizer = TokenizerLoader::new(&source.tokenizer_repo, "tokenizer.json").load(hub)?;
        let params = GenerationParams::resolve(model.get_generation_config(), &self.overrides);

        Ok(TextGenerationPipeline::new(model, tokenizer, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_fill_overrides() {
        let builder = TextGenerationPipelineBuilder::qwen3(Qwen3Source::default())
            .temperature(0.3)
            .top_p(1.7)
            .min_p(-0.2)
            .no_repeat_ngram_size(3)
            .seed(9)
            .cuda(1);

        assert_eq!(builder.overrides.temperature, Some(0.3));
        assert_eq!(builder.overrides.top_p, Some(1.0));
        assert_eq!(builder.overrides.min_p, Some(0.0));
        assert_eq!(builder.overrides.no_repeat_ngram_size, Some(3));
        assert_eq!(builder.overrides.seed, Some(9));
        assert_eq!(builder.device_request, DeviceRequest::Cuda(1));
    }

    #[test]
    fn overrides_replace_previous_setters() {
        let builder = TextGenerationPipelineBuilder::qwen3(Qwen3Source::default())
            .temperature(0.3)
            .overrides(GenerationOverrides {
                top_k: Some(5),
                ..Default::default()
            });
        assert_eq!(builder.overrides.temperature, None);
        assert_eq!(builder.overrides.top_k, Some(5));
    }
}
