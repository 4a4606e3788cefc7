//! Build path: embed every chunk and collect an in-memory index ready to persist.
use indicatif::{ProgressBar, ProgressStyle};

use docqa_core::traits::Embedder;
use docqa_core::types::Chunk;
use docqa_core::{Error, Result};

use crate::manifest::IndexManifest;

const EMBED_BATCH: usize = 32;

/// Chunks paired with their vectors, not yet written anywhere.
///
/// Only `build_index` assembles one, so every chunk has exactly one vector
/// of the manifest's width.
#[derive(Debug, Clone)]
pub struct BuiltIndex {
    pub(crate) manifest: IndexManifest,
    pub(crate) chunks: Vec<Chunk>,
    pub(crate) vectors: Vec<Vec<f32>>,
}

impl BuiltIndex {
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.manifest.dim
    }

    /// Row counts and vector widths agree with the manifest.
    pub(crate) fn check_consistent(&self) -> Result<()> {
        if self.vectors.len() != self.chunks.len() || self.manifest.chunk_count != self.chunks.len() {
            return Err(Error::Storage(format!(
                "{} chunks, {} vectors, manifest records {}",
                self.chunks.len(),
                self.vectors.len(),
                self.manifest.chunk_count
            )));
        }
        match self.vectors.iter().find(|v| v.len() != self.manifest.dim) {
            Some(v) => Err(Error::DimensionMismatch { expected: self.manifest.dim, actual: v.len() }),
            None => Ok(()),
        }
    }
}

/// Embeds `chunks` and returns the index. Refuses an empty chunk list.
pub fn build_index(chunks: Vec<Chunk>, embedder: &dyn Embedder) -> Result<BuiltIndex> {
    if chunks.is_empty() {
        return Err(Error::EmptyCorpus);
    }
    let dim = embedder.dim();
    tracing::info!(chunks = chunks.len(), model = embedder.model_id(), dim, "building index");

    let pb = ProgressBar::new(chunks.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut vectors = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let embedded = embedder.embed_batch(&texts)?;
        if embedded.len() != batch.len() {
            return Err(Error::Embedding(format!("expected {} vectors, got {}", batch.len(), embedded.len())));
        }
        for v in &embedded {
            if v.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, actual: v.len() });
            }
        }
        vectors.extend(embedded);
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();

    let manifest = IndexManifest::new(embedder.model_id(), dim, &chunks);
    Ok(BuiltIndex { manifest, chunks, vectors })
}
