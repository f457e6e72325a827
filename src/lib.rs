//! # prompt-pipelines
//!
//! Load a model from the Hugging Face hub and answer a single prompt with it,
//! either by sampling a continuation or by reporting a classifier's confidence.
//!
//! ```rust,no_run
//! use prompt_pipelines::{InferenceService, ServiceConfig, Task};
//!
//! # fn main() -> prompt_pipelines::error::Result<()> {
//! let service = InferenceService::new(ServiceConfig::new(Task::Generation))?;
//! println!("{}", service.generate_response("Once upon a time", 100));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod loaders;
pub mod logging;
pub mod models;
pub mod pipelines;
pub mod service;

pub use config::{Credential, ServiceConfig, Task, API_KEY_ENV};
pub use error::{PipelineError, Result};
pub use pipelines::Pipeline;
pub use service::{InferenceService, APOLOGY};
