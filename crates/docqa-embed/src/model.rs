use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use docqa_core::traits::Embedder;
use docqa_core::{Error, Result};

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

fn embed_err(e: impl std::fmt::Display) -> Error {
    Error::Embedding(e.to_string())
}

/// Sentence embeddings from a local XLM-RoBERTa checkpoint (BGE-M3 family).
pub struct TransformerEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    max_len: usize,
    dim: usize,
    id: String,
}

impl TransformerEmbedder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::Embedding(format!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e)))?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .map_err(|e| Error::Embedding(format!("Failed to read {}: {}", config_path.display(), e)))?;
        let config: XLMRobertaConfig = serde_json::from_str(&raw_config).map_err(embed_err)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw_config)
            .ok()
            .and_then(|v| v.get("hidden_size").and_then(|h| h.as_u64()))
            .ok_or_else(|| Error::Embedding(format!("{} has no hidden_size", config_path.display())))? as usize;

        let dtype = DType::F32;
        let safetensors = model_dir.join("model.safetensors");
        let vb = if safetensors.exists() {
            // SAFETY: the weights file is not modified while the model is alive
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], dtype, &device) }.map_err(embed_err)?
        } else {
            let weights_path = model_dir.join("pytorch_model.bin");
            let weights = candle_core::pickle::read_all(&weights_path).map_err(embed_err)?;
            let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
            VarBuilder::from_tensors(weights_map, dtype, &device)
        };
        let model = XLMRobertaModel::new(&config, vb).map_err(embed_err)?;

        let name = model_dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "model".to_string());
        let id = format!("{name}:d{dim}");
        tracing::info!(model = %id, max_len, "embedding model loaded");
        Ok(Self { model, tokenizer, device, max_len, dim, id })
    }

    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Vec<Vec<f32>>> {
        let token_type_ids = input_ids.zeros_like()?.to_dtype(DType::I64)?;
        let hidden = self.model.forward(input_ids, attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, attention_mask)?;
        pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()
    }
}

impl Embedder for TransformerEmbedder {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, &self.device)?;
        let vectors = self.forward(&input_ids, &attention_mask).map_err(embed_err)?;
        tracing::debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(vectors)
    }
}

/// Finds the model directory: explicit setting, then `APP_MODEL_DIR`,
/// `MODEL_DIR`, then the conventional `../models/bge-m3` and `models/bge-m3`.
pub fn resolve_model_dir(configured: Option<&Path>) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    candidates.extend(configured.map(Path::to_path_buf));
    candidates.extend(std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from));
    candidates.extend(std::env::var("MODEL_DIR").ok().map(PathBuf::from));
    candidates.push(PathBuf::from("../models/bge-m3"));
    candidates.push(PathBuf::from("models/bge-m3"));
    for dir in candidates {
        if dir.exists() {
            tracing::info!(dir = %dir.display(), "using model dir");
            return Ok(dir);
        }
    }
    Err(Error::Embedding("Could not locate embedding model directory".into()))
}
