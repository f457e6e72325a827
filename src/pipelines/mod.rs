//! Inference pipelines and the pieces they share.

use crate::config::Task;
use crate::error::Result;

pub mod cache;
pub mod classification;
pub mod stats;
pub mod text_generation;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

/// A loaded tokenizer/model pair that turns a prompt into a response string.
pub trait Pipeline: Send + Sync {
    /// Which task this pipeline runs.
    fn task(&self) -> Task;

    /// Run inference on `prompt`.
    ///
    /// `max_length` is the total token cap for generation and the truncation and
    /// padding length for classification.
    fn respond(&self, prompt: &str, max_length: usize) -> Result<String>;
}
