use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::modernbert::{
    ClassifierConfig, ClassifierPooling, Config,
    ModernBertForSequenceClassification as CandleModernBertForSequenceClassification,
};
use serde::Deserialize;
use std::collections::HashMap;

use super::capabilities::SequenceClassificationModel;
use crate::error::Result;
use crate::loaders::{HfLoader, Hub};

/// Where to fetch a ModernBERT sequence classifier from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModernBertSource {
    /// Repository holding `config.json`, the weights and `tokenizer.json`.
    pub repo: String,
}

impl Default for ModernBertSource {
    fn default() -> Self {
        Self {
            repo: "clapAI/modernBERT-base-multilingual-sentiment".into(),
        }
    }
}

impl std::fmt::Display for ModernBertSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.repo)
    }
}

impl crate::pipelines::cache::ModelOptions for ModernBertSource {
    fn cache_key(&self) -> String {
        self.to_string()
    }
}

pub struct ModernBertClassifier {
    model: CandleModernBertForSequenceClassification,
    device: Device,
}

impl ModernBertClassifier {
    pub(crate) fn from_hub(hub: &Hub, source: &ModernBertSource, device: &Device) -> Result<Self> {
        let (config, vb, num_labels) = load_classifier_model(hub, &source.repo, device)?;
        let model = CandleModernBertForSequenceClassification::load(vb, &config)?;

        tracing::info!(model = %source, labels = num_labels, "loaded modernbert classifier");

        Ok(Self {
            model,
            device: device.clone(),
        })
    }
}

impl SequenceClassificationModel for ModernBertClassifier {
    fn classify(&self, input_ids: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        self.model.forward(input_ids, attention_mask)
    }

    fn device(&self) -> &Device {
        &self.device
    }
}

#[derive(Deserialize)]
struct ClassifierConfigJson {
    #[serde(default)]
    id2label: HashMap<String, String>,
    #[serde(default)]
    label2id: HashMap<String, u32>,
}

impl ClassifierConfigJson {
    fn num_labels(&self) -> usize {
        self.label2id.len().max(self.id2label.len())
    }
}

// candle sizes the classifier head from `id2label`, which some checkpoints omit.
fn patch_config_num_labels(config: &mut Config, num_labels: usize) {
    if config
        .classifier_config
        .as_ref()
        .map(|c| c.id2label.len())
        .unwrap_or(0)
        != num_labels
    {
        let id2label: HashMap<String, String> = (0..num_labels)
            .map(|i| (i.to_string(), format!("label_{i}")))
            .collect();
        let label2id: HashMap<String, String> = id2label
            .iter()
            .map(|(k, v)| (v.clone(), k.clone()))
            .collect();

        config.classifier_config = Some(ClassifierConfig {
            id2label,
            label2id,
            classifier_pooling: ClassifierPooling::default(),
        });
    }
}

fn load_classifier_model(
    hub: &Hub,
    repo_id: &str,
    device: &Device,
) -> Result<(Config, VarBuilder<'static>, usize)> {
    let config_path = HfLoader::new(repo_id, "config.json").load(hub)?;
    let weights_path = HfLoader::new(repo_id, "model.safetensors")
        .load(hub)
        .or_else(|_| HfLoader::new(repo_id, "pytorch_model.bin").load(hub))?;

    let config_str = std::fs::read_to_string(&config_path)?;
    let mut config: Config = serde_json::from_str(&config_str)?;
    let class_cfg: ClassifierConfigJson = serde_json::from_str(&config_str)?;

    let num_labels = class_cfg.num_labels();
    patch_config_num_labels(&mut config, num_labels);

    let vb = if weights_path.extension().is_some_and(|e| e == "safetensors") {
        // SAFETY: the file is owned by the hub cache and not modified while mapped.
        unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)? }
    } else {
        VarBuilder::from_pth(&weights_path, DType::F32, device)?
    };

    Ok((config, vb, num_labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_count_uses_the_larger_map() {
        let cfg: ClassifierConfigJson = serde_json::from_str(
            r#"{"id2label": {"0": "negative", "1": "neutral", "2": "positive"}, "label2id": {}}"#,
        )
        .unwrap();
        assert_eq!(cfg.num_labels(), 3);

        let cfg: ClassifierConfigJson = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.num_labels(), 0);
    }
}
