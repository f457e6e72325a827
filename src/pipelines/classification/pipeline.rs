use candle_core::{Tensor, D};
use candle_nn::ops::softmax;
use std::sync::Arc;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::config::Task;
use crate::error::{PipelineError, Result};
use crate::models::capabilities::SequenceClassificationModel;
use crate::pipelines::stats::EncoderStats;
use crate::pipelines::Pipeline;

// ============ Output types ============

/// The most likely class and its probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Index of the top class in the model's output.
    pub class_index: usize,
    /// Softmax probability of that class (0.0 to 1.0).
    pub confidence: f32,
}

/// Output from [`ClassificationPipeline::run`].
#[derive(Debug, Clone)]
pub struct Output {
    /// Top class prediction.
    pub prediction: Prediction,
    /// Execution statistics.
    pub stats: EncoderStats,
}

/// Render a confidence as `Confidence: NN.NN%`, clamped to 0..=100.
pub fn format_confidence(confidence: f32) -> String {
    let percent = (confidence * 100.0).clamp(0.0, 100.0);
    format!("Confidence: {percent:.2}%")
}

// ============ Pipeline ============

/// Scores a text with a sequence classifier and reports the top class confidence.
///
/// Construct with [`ClassificationPipelineBuilder`](super::ClassificationPipelineBuilder).
pub struct ClassificationPipeline<M: SequenceClassificationModel> {
    pub(crate) model: Arc<M>,
    pub(crate) tokenizer: Tokenizer,
}

impl<M: SequenceClassificationModel> ClassificationPipeline<M> {
    pub(crate) fn new(model: Arc<M>, tokenizer: Tokenizer) -> Self {
        Self { model, tokenizer }
    }

    /// Classify `text`, truncated and padded to exactly `max_length` tokens.
    pub fn run(&self, text: &str, max_length: usize) -> Result<Output> {
        let stats = EncoderStats::start();
        let tokenizer = self.fixed_length_tokenizer(max_length)?;

        let encoding = tokenizer.encode(text, true).map_err(|e| {
            PipelineError::Tokenization(format!(
                "Tokenization failed on '{}': {}",
                &text.chars().take(50).collect::<String>(),
                e
            ))
        })?;

        let device = self.model.device();
        let input_ids = Tensor::new(encoding.get_ids(), device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), device)?.unsqueeze(0)?;

        let logits = self.model.classify(&input_ids, &attention_mask)?;
        let probs = softmax(&logits, D::Minus1)?.squeeze(0)?.to_vec1::<f32>()?;

        let (class_index, confidence) = probs
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, p)| match best {
                Some((_, best_p)) if best_p >= p => best,
                _ => Some((i, p)),
            })
            .ok_or_else(|| PipelineError::Unexpected("Model returned no class scores".into()))?;
        if !confidence.is_finite() {
            return Err(PipelineError::Unexpected(format!(
                "Model produced a non-finite probability for class {class_index}"
            )));
        }

        let stats = stats.finish(encoding.get_ids().len());
        tracing::debug!(
            class = class_index,
            confidence,
            input_tokens = stats.input_tokens,
            elapsed_ms = stats.total_time.as_millis() as u64,
            "classification finished"
        );

        Ok(Output {
            prediction: Prediction {
                class_index,
                confidence,
            },
            stats,
        })
    }

    fn fixed_length_tokenizer(&self, max_length: usize) -> Result<Tokenizer> {
        if max_length == 0 {
            return Err(PipelineError::Tokenization(
                "max_length must be at least 1".to_string(),
            ));
        }

        let pad_id = self
            .tokenizer
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| self.tokenizer.token_to_id("[PAD]"))
            .or_else(|| self.tokenizer.token_to_id("<pad>"))
            .unwrap_or(0);
        let pad_token = self
            .tokenizer
            .id_to_token(pad_id)
            .unwrap_or_else(|| "[PAD]".to_string());

        let mut tokenizer = self.tokenizer.clone();
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| PipelineError::Tokenization(format!("Truncation setup failed: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_length),
            pad_id,
            pad_token,
            ..Default::default()
        }));
        Ok(tokenizer)
    }
}

impl<M> Pipeline for ClassificationPipeline<M>
where
    M: SequenceClassificationModel + Send + Sync,
{
    fn task(&self) -> Task {
        Task::Classification
    }

    fn respond(&self, prompt: &str, max_length: usize) -> Result<String> {
        let output = self.run(prompt, max_length)?;
        Ok(format_confidence(output.prediction.confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::testing::word_tokenizer;
    use candle_core::Device;
    use std::sync::Mutex;

    /// Two classes; logits are `[attended tokens, 1.0]`.
    struct CountingClassifier {
        device: Device,
        seen: Mutex<Vec<(Vec<u32>, Vec<u32>)>>,
    }

    impl CountingClassifier {
        fn new() -> Self {
            Self {
                device: Device::Cpu,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn last_seen(&self) -> (Vec<u32>, Vec<u32>) {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl SequenceClassificationModel for CountingClassifier {
        fn classify(&self, input_ids: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
            let ids = input_ids.squeeze(0)?.to_vec1::<u32>()?;
            let mask = attention_mask.squeeze(0)?.to_vec1::<u32>()?;
            let attended = mask.iter().sum::<u32>() as f32;
            self.seen.lock().unwrap().push((ids, mask));
            Tensor::new(&[[attended, 1.0f32]], &self.device)
        }

        fn device(&self) -> &Device {
            &self.device
        }
    }

    fn pipeline() -> ClassificationPipeline<CountingClassifier> {
        ClassificationPipeline::new(Arc::new(CountingClassifier::new()), word_tokenizer())
    }

    #[test]
    fn short_input_is_padded_to_max_length() -> Result<()> {
        let pipeline = pipeline();
        pipeline.run("hello world", 6)?;

        let (ids, mask) = pipeline.model.last_seen();
        assert_eq!(ids, vec![2, 3, 5, 5, 5, 5]);
        assert_eq!(mask, vec![1, 1, 0, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn long_input_is_truncated_to_max_length() -> Result<()> {
        let pipeline = pipeline();
        let output = pipeline.run("hello world again hello world", 3)?;

        let (ids, mask) = pipeline.model.last_seen();
        assert_eq!(ids, vec![2, 3, 4]);
        assert_eq!(mask, vec![1, 1, 1]);
        assert_eq!(output.stats.input_tokens, 3);
        Ok(())
    }

    #[test]
    fn reports_the_top_class_probability() -> Result<()> {
        // logits [2, 1] -> softmax max = e / (e + 1)
        let output = pipeline().run("hello world", 8)?;
        let expected = std::f32::consts::E / (std::f32::consts::E + 1.0);
        assert_eq!(output.prediction.class_index, 0);
        assert!((output.prediction.confidence - expected).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn ties_pick_the_first_class() -> Result<()> {
        // one attended token -> logits [1, 1]
        let output = pipeline().run("again", 4)?;
        assert_eq!(output.prediction.class_index, 0);
        assert!((output.prediction.confidence - 0.5).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn repeated_calls_agree() -> Result<()> {
        let pipeline = pipeline();
        let first = pipeline.respond("hello again", 16)?;
        let second = pipeline.respond("hello again", 16)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn respond_formats_a_percentage() -> Result<()> {
        let pipeline = pipeline();
        assert_eq!(pipeline.task(), Task::Classification);
        assert_eq!(pipeline.respond("hello world", 8)?, "Confidence: 73.11%");
        Ok(())
    }

    #[test]
    fn zero_max_length_is_rejected() {
        let err = pipeline().run("hello", 0).unwrap_err();
        assert!(matches!(err, PipelineError::Tokenization(_)));
    }

    #[test]
    fn confidence_formatting_is_clamped() {
        assert_eq!(format_confidence(0.5), "Confidence: 50.00%");
        assert_eq!(format_confidence(1.0), "Confidence: 100.00%");
        assert_eq!(format_confidence(1.2), "Confidence: 100.00%");
        assert_eq!(format_confidence(-0.3), "Confidence: 0.00%");
    }
}
