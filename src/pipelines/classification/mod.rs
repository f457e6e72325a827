//! Sequence classification pipeline.
//!
//! Runs a classifier over one text and reports how confident it is in its top
//! class. Class labels are not resolved; only the index and probability are kept.
//!
//! ```rust,no_run
//! use prompt_pipelines::loaders::Hub;
//! use prompt_pipelines::models::ModernBertSource;
//! use prompt_pipelines::pipelines::classification::{format_confidence, ClassificationPipelineBuilder};
//! use prompt_pipelines::Credential;
//!
//! # fn main() -> prompt_pipelines::error::Result<()> {
//! let hub = Hub::new(&Credential::from_env("HUGGINGFACE_API_KEY")?, None)?;
//! let pipeline = ClassificationPipelineBuilder::modernbert(ModernBertSource::default()).build(&hub)?;
//!
//! let output = pipeline.run("I absolutely love this product!", 512)?;
//! println!("{}", format_confidence(output.prediction.confidence));
//! # Ok(())
//! # }
//! ```

pub(crate) mod builder;
pub(crate) mod pipeline;

pub use crate::pipelines::stats::EncoderStats;
pub use builder::ClassificationPipelineBuilder;
pub use pipeline::{format_confidence, ClassificationPipeline, Output, Prediction};
