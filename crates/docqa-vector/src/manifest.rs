//! Sidecar describing how an index version was built.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use docqa_core::types::Chunk;
use docqa_core::{Error, Result};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedder_id: String,
    pub dim: usize,
    pub chunk_count: usize,
    pub corpus_hash: String,
    pub built_at: DateTime<Utc>,
}

impl IndexManifest {
    pub fn new(embedder_id: &str, dim: usize, chunks: &[Chunk]) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            embedder_id: embedder_id.to_string(),
            dim,
            chunk_count: chunks.len(),
            corpus_hash: corpus_hash(chunks),
            built_at: Utc::now(),
        }
    }

    /// Rejects manifests this build cannot serve with the given embedder.
    pub fn check_compatible(&self, embedder_id: &str, dim: usize) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(Error::IndexCorrupt(format!("unsupported index format {}", self.format_version)));
        }
        if self.dim != dim || self.embedder_id != embedder_id {
            return Err(Error::IndexCorrupt(format!(
                "index built with {} (d{}), embedder is {} (d{})",
                self.embedder_id, self.dim, embedder_id, dim
            )));
        }
        Ok(())
    }
}

/// blake3 over every chunk's source label and content, in order.
pub fn corpus_hash(chunks: &[Chunk]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in chunks {
        hasher.update(c.source_label.as_bytes());
        hasher.update(&[0]);
        hasher.update(c.content.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}

pub async fn write_manifest(dir: &Path, manifest: &IndexManifest) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(manifest).map_err(|e| Error::Storage(format!("encode manifest: {e}")))?;
    tokio::fs::write(dir.join(MANIFEST_FILE), bytes).await?;
    Ok(())
}

pub async fn read_manifest(dir: &Path) -> Result<IndexManifest> {
    let path = dir.join(MANIFEST_FILE);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| Error::IndexCorrupt(format!("read {}: {e}", path.display())))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::IndexCorrupt(format!("parse {}: {e}", path.display())))
}
