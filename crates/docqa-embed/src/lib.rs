//! Embedder implementations behind the `docqa_core::traits::Embedder` trait.
//!
//! `from_config` picks the local transformer model or the hashing embedder
//! according to `embedding.backend`.
use std::path::Path;

use docqa_core::config::{EmbeddingBackend, EmbeddingConfig};
use docqa_core::traits::Embedder;
use docqa_core::Result;

pub mod device;
pub mod hash;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use hash::HashEmbedder;
pub use model::{resolve_model_dir, TransformerEmbedder};
pub use pool::masked_mean_l2;

/// Token limit of the hashing embedder; far above any chunk size.
const HASH_MAX_TOKENS: usize = 8192;

pub fn from_config(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.backend {
        EmbeddingBackend::Hash => {
            tracing::info!(dim = config.hash_dim, "using hash embedder");
            Ok(Box::new(HashEmbedder::new(config.hash_dim, HASH_MAX_TOKENS)))
        }
        EmbeddingBackend::Model => {
            let dir = resolve_model_dir(config.model_dir.as_deref().map(Path::new))?;
            Ok(Box::new(TransformerEmbedder::load(&dir, config.max_len)?))
        }
    }
}
