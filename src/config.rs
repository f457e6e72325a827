//! Service configuration: the task to run, where its model lives, and the hub credential.

use std::fmt;
use std::path::PathBuf;

use crate::error::{PipelineError, Result};
use crate::models::{ModernBertSource, Qwen3Source};
use crate::pipelines::text_generation::GenerationOverrides;
use crate::pipelines::utils::DeviceRequest;

/// Environment variable holding the Hugging Face access token.
pub const API_KEY_ENV: &str = "HUGGINGFACE_API_KEY";

/// Which kind of model the service runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Task {
    /// Sampled continuation of the prompt.
    #[default]
    Generation,
    /// Top-class confidence of a sequence classifier.
    Classification,
}

impl Task {
    /// Length used when the caller does not pass one.
    ///
    /// For generation this caps prompt plus new tokens, for classification it is the
    /// truncation and padding length.
    pub fn default_max_length(self) -> usize {
        match self {
            Task::Generation => 100,
            Task::Classification => 512,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Generation => write!(f, "generation"),
            Task::Classification => write!(f, "classification"),
        }
    }
}

/// Hugging Face access token.
///
/// The value is never printed by `Debug`.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Read the token from `var`. Unset or blank values are a [`PipelineError::Config`].
    pub fn from_env(var: &str) -> Result<Self> {
        Self::new(std::env::var(var).ok()).map_err(|_| {
            PipelineError::Config(format!(
                "Hugging Face API key not found: set the {var} environment variable"
            ))
        })
    }

    /// Wrap an already obtained token.
    pub fn new(value: Option<String>) -> Result<Self> {
        match value {
            Some(v) if !v.trim().is_empty() => Ok(Self(v)),
            _ => Err(PipelineError::Config(
                "Hugging Face API key is empty".to_string(),
            )),
        }
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Everything [`InferenceService::new`](crate::InferenceService::new) needs.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Task to run.
    pub task: Task,
    /// Model used when `task` is [`Task::Generation`].
    pub generation: Qwen3Source,
    /// Model used when `task` is [`Task::Classification`].
    pub classification: ModernBertSource,
    /// Sampling parameters that take precedence over the model's generation config.
    pub overrides: GenerationOverrides,
    /// Device to load the model on.
    pub device: DeviceRequest,
    /// Hub cache directory. `None` uses the hf-hub default.
    pub cache_dir: Option<PathBuf>,
    /// Environment variable the credential is read from.
    pub credential_var: String,
}

impl ServiceConfig {
    /// Defaults for `task`: the stock model for that task on CPU.
    pub fn new(task: Task) -> Self {
        Self {
            task,
            generation: Qwen3Source::default(),
            classification: ModernBertSource::default(),
            overrides: GenerationOverrides::default(),
            device: DeviceRequest::Cpu,
            cache_dir: None,
            credential_var: API_KEY_ENV.to_string(),
        }
    }

    /// Repository id of the model the service will load.
    pub fn model_id(&self) -> &str {
        match self.task {
            Task::Generation => &self.generation.repo,
            Task::Classification => &self.classification.repo,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(Task::default())
    }
}
