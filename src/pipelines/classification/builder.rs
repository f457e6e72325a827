use super::pipeline::ClassificationPipeline;
use crate::error::Result;
use crate::loaders::{Hub, TokenizerLoader};
use crate::models::{ModernBertClassifier, ModernBertSource};
use crate::pipelines::cache::global_cache;
use crate::pipelines::utils::{build_cache_key, DeviceRequest};

/// Builder for [`ClassificationPipeline`] instances.
#[derive(Debug, Clone, Default)]
pub struct ClassificationPipelineBuilder {
    source: ModernBertSource,
    device_request: DeviceRequest,
}

impl ClassificationPipelineBuilder {
    /// Create a builder for a ModernBERT sequence classifier.
    pub fn modernbert(source: ModernBertSource) -> Self {
        Self {
            source,
            device_request: DeviceRequest::Cpu,
        }
    }

    pub fn device(mut self, device_request: DeviceRequest) -> Self {
        self.device_request = device_request;
        self
    }

    pub fn cpu(self) -> Self {
        self.device(DeviceRequest::Cpu)
    }

    pub fn cuda(self, index: usize) -> Self {
        self.device(DeviceRequest::Cuda(index))
    }

    /// Build the pipeline, downloading and loading the model if needed.
    pub fn build(self, hub: &Hub) -> Result<ClassificationPipeline<ModernBertClassifier>> {
        let device = self.device_request.resolve()?;
        let cache_key = build_cache_key(&self.source, &device);

        let source = self.source;
        let model = global_cache().get_or_create(&cache_key, || {
            ModernBertClassifier::from_hub(hub, &source, &device)
        })?;
        let tokenizer = TokenizerLoader::new(&source.repo, "tokenizer.json").load(hub)?;

        Ok(ClassificationPipeline::new(model, tokenizer))
    }
}
