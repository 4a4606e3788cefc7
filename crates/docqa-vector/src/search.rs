use arrow_array::{Float32Array, Int32Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};

use docqa_core::types::{Chunk, SearchHit};
use docqa_core::{Error, Result};

use crate::manifest::IndexManifest;

/// A loaded, read-only index version.
///
/// Scores are cosine similarities clamped to `[0, 1]`; higher is more similar.
pub struct VectorIndex {
    pub(crate) table: Table,
    pub(crate) manifest: IndexManifest,
    pub(crate) version: String,
}

impl VectorIndex {
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn dim(&self) -> usize {
        self.manifest.dim
    }

    pub fn len(&self) -> usize {
        self.manifest.chunk_count
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.chunk_count == 0
    }

    /// Up to `k` nearest chunks, most similar first.
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dim() {
            return Err(Error::DimensionMismatch { expected: self.dim(), actual: query.len() });
        }
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut stream = self
            .table
            .vector_search(query.to_vec())
            .map_err(|e| Error::Storage(format!("vector query: {e}")))?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(|e| Error::Storage(format!("vector query: {e}")))?;

        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(|e| Error::Storage(format!("read results: {e}")))? {
            hits.extend(hits_from_batch(&batch)?);
        }
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        tracing::debug!(k, returned = hits.len(), top = hits.first().map(|h| h.score), "search");
        Ok(hits)
    }
}

/// Cosine distance lies in `[0, 2]`; map it onto similarity `[0, 1]`.
pub fn similarity_from_distance(distance: f32) -> f32 {
    (1.0 - distance).clamp(0.0, 1.0)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| Error::IndexCorrupt(format!("result column '{name}' missing or mistyped")))
}

fn hits_from_batch(batch: &RecordBatch) -> Result<Vec<SearchHit>> {
    let contents = column::<StringArray>(batch, "content")?;
    let labels = column::<StringArray>(batch, "source_label")?;
    let indices = column::<Int32Array>(batch, "chunk_index")?;
    let distances = column::<Float32Array>(batch, "_distance")?;
    Ok((0..batch.num_rows())
        .map(|i| SearchHit {
            chunk: Chunk {
                content: contents.value(i).to_string(),
                source_label: labels.value(i).to_string(),
                chunk_index: usize::try_from(indices.value(i)).unwrap_or_default(),
            },
            score: similarity_from_distance(distances.value(i)),
        })
        .collect())
}
