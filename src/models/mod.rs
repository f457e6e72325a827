// ============ Model capability traits ============

pub mod capabilities;

// ============ Model implementations ============

pub(crate) mod modernbert;
pub(crate) mod qwen3;

pub use modernbert::{ModernBertClassifier, ModernBertSource};
pub use qwen3::{Qwen3, Qwen3Source};
