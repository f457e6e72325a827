//! Text generation pipeline.
//!
//! Continues a prompt by sampling from a causal language model. No n-gram of
//! `no_repeat_ngram_size` tokens (2 by default) appears twice in the prompt plus
//! continuation.
//!
//! ```rust,no_run
//! use prompt_pipelines::loaders::Hub;
//! use prompt_pipelines::models::Qwen3Source;
//! use prompt_pipelines::pipelines::text_generation::TextGenerationPipelineBuilder;
//! use prompt_pipelines::Credential;
//!
//! # fn main() -> prompt_pipelines::error::Result<()> {
//! let hub = Hub::new(&Credential::from_env("HUGGINGFACE_API_KEY")?, None)?;
//! let pipeline = TextGenerationPipelineBuilder::qwen3(Qwen3Source::default())
//!     .temperature(0.7)
//!     .build(&hub)?;
//!
//! let output = pipeline.run("Once upon a time", 100)?;
//! println!("{}", output.text);
//! # Ok(())
//! # }
//! ```

pub(crate) mod builder;
pub(crate) mod params;
pub(crate) mod pipeline;

pub use builder::TextGenerationPipelineBuilder;
pub use params::{GenerationOverrides, GenerationParams};
pub use pipeline::{Output, TextGenerationPipeline};
pub use crate::pipelines::stats::GenerationStats;
