//! The inference service: one configured pipeline behind a never-failing call.

use std::panic::{self, AssertUnwindSafe};

use crate::config::{Credential, ServiceConfig, Task};
use crate::error::Result;
use crate::loaders::Hub;
use crate::pipelines::classification::ClassificationPipelineBuilder;
use crate::pipelines::text_generation::TextGenerationPipelineBuilder;
use crate::pipelines::Pipeline;

/// Returned by [`InferenceService::generate_response`] whenever inference fails.
pub const APOLOGY: &str = "عذراً، حدث خطأ أثناء معالجة طلبك.";

/// Loads one model for one task and answers prompts with it.
pub struct InferenceService {
    pipeline: Box<dyn Pipeline>,
}

impl InferenceService {
    /// Read the credential, then download and load the configured model.
    ///
    /// A missing or blank credential fails with [`PipelineError::Config`](crate::PipelineError::Config)
    /// before anything is fetched.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let credential = Credential::from_env(&config.credential_var)?;
        let hub = Hub::new(&credential, config.cache_dir.clone())?;

        tracing::info!(task = %config.task, model = config.model_id(), "loading model");

        let pipeline: Box<dyn Pipeline> = match config.task {
            Task::Generation => Box::new(
                TextGenerationPipelineBuilder::qwen3(config.generation)
                    .overrides(config.overrides)
                    .device(config.device)
                    .build(&hub)?,
            ),
            Task::Classification => Box::new(
                ClassificationPipelineBuilder::modernbert(config.classification)
                    .device(config.device)
                    .build(&hub)?,
            ),
        };

        Ok(Self::from_pipeline(pipeline))
    }

    /// Wrap a pipeline that is already loaded.
    pub fn from_pipeline(pipeline: Box<dyn Pipeline>) -> Self {
        Self { pipeline }
    }

    pub fn task(&self) -> Task {
        self.pipeline.task()
    }

    pub fn default_max_length(&self) -> usize {
        self.task().default_max_length()
    }

    /// Run the pipeline on `prompt`.
    ///
    /// Errors and panics from the inference stack are logged and replaced by [`APOLOGY`].
    pub fn generate_response(&self, prompt: &str, max_length: usize) -> String {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.pipeline.respond(prompt, max_length)
        }));

        match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!("Error generating response: {e}");
                APOLOGY.to_string()
            }
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!("Error generating response: {reason}");
                APOLOGY.to_string()
            }
        }
    }
}
