use candle_core::{DType, Tensor};
use candle_transformers::generation::{LogitsProcessor as CandleLogitsProcessor, Sampling};

use crate::loaders::GenerationConfig;

pub use candle_transformers::utils::apply_repeat_penalty;

const DEFAULT_TEMPERATURE: f64 = 1.0;
const DEFAULT_TOP_K: usize = 50;
const DEFAULT_REPEAT_PENALTY: f32 = 1.0;
const DEFAULT_REPEAT_LAST_N: usize = 64;
const DEFAULT_NO_REPEAT_NGRAM_SIZE: usize = 2;

/// User overrides for generation parameters.
/// All fields are optional - only set fields will override model defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOverrides {
    pub temperature: Option<f64>,
    pub repeat_penalty: Option<f32>,
    pub repeat_last_n: Option<usize>,
    pub no_repeat_ngram_size: Option<usize>,
    pub seed: Option<u64>,
    pub top_p: Option<f64>,
    pub top_k: Option<usize>,
    pub min_p: Option<f64>,
}

/// Resolved parameters controlling text generation sampling behavior.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Randomness of sampling. 0.0 = deterministic, higher = more random.
    pub temperature: f64,
    /// Penalty for repeating tokens. 1.0 = no penalty, higher = less repetition.
    pub repeat_penalty: f32,
    /// Number of recent tokens to consider for repeat penalty.
    pub repeat_last_n: usize,
    /// No n-gram of this size may occur twice. 0 disables the constraint.
    pub no_repeat_ngram_size: usize,
    /// Random seed for reproducible generation.
    pub seed: u64,
    /// Nucleus sampling: only consider tokens with cumulative probability <= p.
    pub top_p: Option<f64>,
    /// Only consider the top k most likely tokens.
    pub top_k: Option<usize>,
    /// Filter tokens with probability < min_p * max_probability.
    pub min_p: Option<f64>,
}

impl GenerationParams {
    /// Resolve generation params: user overrides, then the model's config, then defaults.
    pub fn resolve(config: &GenerationConfig, overrides: &GenerationOverrides) -> Self {
        let temperature = overrides
            .temperature
            .or(config.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE);
        let repeat_penalty = overrides
            .repeat_penalty
            .or(config.repeat_penalty)
            .unwrap_or(DEFAULT_REPEAT_PENALTY);
        let repeat_last_n = overrides
            .repeat_last_n
            .or(config.repeat_last_n)
            .unwrap_or(DEFAULT_REPEAT_LAST_N);
        let no_repeat_ngram_size = overrides
            .no_repeat_ngram_size
            .or(config.no_repeat_ngram_size)
            .unwrap_or(DEFAULT_NO_REPEAT_NGRAM_SIZE);

        let seed = overrides.seed.unwrap_or_else(rand::random);

        let top_p = overrides.top_p.or(config.top_p);
        let top_k = overrides
            .top_k
            .or(config.top_k.map(|k| k as usize))
            .or(Some(DEFAULT_TOP_K));
        let min_p = overrides.min_p.or(config.min_p).filter(|p| *p > 0.0);

        Self {
            temperature,
            repeat_penalty,
            repeat_last_n,
            no_repeat_ngram_size,
            seed,
            top_p,
            top_k,
            min_p,
        }
    }

    pub(crate) fn sampling_strategy(&self) -> Sampling {
        if self.temperature <= 0.0 {
            return Sampling::ArgMax;
        }

        let temperature = self.temperature.max(1e-7);
        let top_k = self.top_k.unwrap_or(0);
        let top_p = self.top_p.unwrap_or(1.0);

        match (top_k > 0, top_p < 1.0) {
            (true, true) => Sampling::TopKThenTopP {
                k: top_k,
                p: top_p,
                temperature,
            },
            (true, false) => Sampling::TopK {
                k: top_k,
                temperature,
            },
            (false, true) => Sampling::TopP {
                p: top_p,
                temperature,
            },
            (false, false) => Sampling::All { temperature },
        }
    }
}

pub struct LogitsProcessor {
    inner: CandleLogitsProcessor,
    min_p: Option<f32>,
}

impl LogitsProcessor {
    pub fn new(seed: u64, sampling: Sampling, min_p: Option<f64>) -> Self {
        Self {
            inner: CandleLogitsProcessor::from_sampling(seed, sampling),
            min_p: min_p.map(|p| p as f32),
        }
    }

    pub fn sample(&mut self, logits: &Tensor) -> candle_core::Result<u32> {
        let min_p = self.min_p;
        self.inner.sample_f(logits, |prs| {
            if let Some(min_p) = min_p {
                apply_min_p(prs, min_p);
            }
        })
    }
}

pub fn initialize_logits_processor(params: &GenerationParams) -> LogitsProcessor {
    LogitsProcessor::new(params.seed, params.sampling_strategy(), params.min_p)
}

fn apply_min_p(prs: &mut [f32], min_p: f32) {
    if min_p <= 0.0 || min_p >= 1.0 {
        return;
    }
    let max_prob = prs.iter().copied().fold(0.0f32, f32::max);
    let threshold = min_p * max_prob;
    for p in prs.iter_mut() {
        if *p < threshold {
            *p = 0.0;
        }
    }
}

/// Tokens that would complete an n-gram of size `n` already present in `tokens`.
pub fn banned_ngram_tokens(tokens: &[u32], n: usize) -> Vec<u32> {
    if n == 0 || tokens.len() + 1 < n {
        return Vec::new();
    }

    let prefix = &tokens[tokens.len() + 1 - n..];
    let mut banned: Vec<u32> = tokens
        .windows(n)
        .filter(|window| &window[..n - 1] == prefix)
        .map(|window| window[n - 1])
        .collect();
    banned.sort_unstable();
    banned.dedup();
    banned
}

/// Push the logits of n-gram completing tokens to -inf.
pub fn apply_no_repeat_ngram(logits: &Tensor, n: usize, context: &[u32]) -> candle_core::Result<Tensor> {
    let banned = banned_ngram_tokens(context, n);
    if banned.is_empty() {
        return Ok(logits.clone());
    }

    let device = logits.device();
    let mut logits = logits.to_dtype(DType::F32)?.to_vec1::<f32>()?;
    for token in banned {
        if let Some(logit) = logits.get_mut(token as usize) {
            *logit = f32::NEG_INFINITY;
        }
    }
    let len = logits.len();
    Tensor::from_vec(logits, len, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn min_p_filters_low_probs() {
        let mut prs = vec![0.5, 0.3, 0.15, 0.05];
        apply_min_p(&mut prs, 0.5);
        assert_eq!(prs, vec![0.5, 0.3, 0.0, 0.0]);
    }

    #[test]
    fn min_p_noop_when_zero() {
        let mut prs = vec![0.5, 0.3, 0.2];
        apply_min_p(&mut prs, 0.0);
        assert_eq!(prs, vec![0.5, 0.3, 0.2]);
    }

    #[test]
    fn bigram_ban_uses_last_token_as_prefix() {
        // "a b a" -> the prefix is "a", and "a b" already happened.
        assert_eq!(banned_ngram_tokens(&[1, 2, 1], 2), vec![2]);
        assert_eq!(banned_ngram_tokens(&[1, 2, 1, 3, 1], 2), vec![2, 3]);
        assert!(banned_ngram_tokens(&[1, 2, 3], 2).is_empty());
    }

    #[test]
    fn ngram_ban_needs_enough_history() {
        assert!(banned_ngram_tokens(&[], 2).is_empty());
        assert!(banned_ngram_tokens(&[5], 3).is_empty());
        assert!(banned_ngram_tokens(&[5, 5, 5], 0).is_empty());
    }

    #[test]
    fn unigram_ban_blocks_everything_seen() {
        assert_eq!(banned_ngram_tokens(&[4, 1, 4], 1), vec![1, 4]);
    }

    #[test]
    fn trigram_ban() {
        // "x y z x y" -> next "z" would repeat "x y z".
        assert_eq!(banned_ngram_tokens(&[7, 8, 9, 7, 8], 3), vec![9]);
    }

    #[test]
    fn banned_logits_become_neg_inf() -> candle_core::Result<()> {
        let logits = Tensor::new(&[1.0f32, 2.0, 3.0], &Device::Cpu)?;
        let out = apply_no_repeat_ngram(&logits, 2, &[0, 2, 0])?.to_vec1::<f32>()?;
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], 2.0);
        assert_eq!(out[2], f32::NEG_INFINITY);
        Ok(())
    }

    #[test]
    fn overrides_win_over_model_config() {
        let config = GenerationConfig {
            temperature: Some(0.6),
            top_k: Some(20),
            top_p: Some(0.95),
            ..Default::default()
        };
        let overrides = GenerationOverrides {
            temperature: Some(0.0),
            seed: Some(7),
            ..Default::default()
        };
        let params = GenerationParams::resolve(&config, &overrides);
        assert_eq!(params.temperature, 0.0);
        assert_eq!(params.top_k, Some(20));
        assert_eq!(params.top_p, Some(0.95));
        assert_eq!(params.seed, 7);
        assert!(matches!(params.sampling_strategy(), Sampling::ArgMax));
    }

    #[test]
    fn defaults_sample_with_bigram_ban() {
        let params =
            GenerationParams::resolve(&GenerationConfig::default(), &GenerationOverrides::default());
        assert_eq!(params.temperature, 1.0);
        assert_eq!(params.top_k, Some(50));
        assert_eq!(params.no_repeat_ngram_size, 2);
        assert_eq!(params.repeat_penalty, 1.0);
        assert!(params.min_p.is_none());
        assert!(matches!(
            params.sampling_strategy(),
            Sampling::TopK { k: 50, .. }
        ));
    }
}
