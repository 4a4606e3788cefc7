use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use std::path::Path;
use std::sync::Arc;

use docqa_core::{Error, Result};

use crate::index_build::BuiltIndex;
use crate::schema::{build_chunk_schema, CHUNKS_TABLE};
use crate::table::open_db;

const BATCH_ROWS: usize = 1000;

/// Writes `index` as a fresh LanceDB database in `dir`.
pub async fn write_table(dir: &Path, index: &BuiltIndex) -> Result<()> {
    let dim = i32::try_from(index.dim()).map_err(|_| Error::Storage(format!("dimension {} too large", index.dim())))?;
    let schema = build_chunk_schema(dim);

    let mut batches = Vec::new();
    for start in (0..index.len()).step_by(BATCH_ROWS) {
        let end = (start + BATCH_ROWS).min(index.len());
        batches.push(to_record_batch(index, start, end, dim)?);
    }

    let db = open_db(dir).await?;
    let reader = Box::new(RecordBatchIterator::new(batches.into_iter().map(Ok), schema));
    db.create_table(CHUNKS_TABLE, reader)
        .execute()
        .await
        .map_err(|e| Error::Storage(format!("create table in {}: {e}", dir.display())))?;
    tracing::debug!(dir = %dir.display(), rows = index.len(), "wrote chunks table");
    Ok(())
}

fn to_record_batch(index: &BuiltIndex, start: usize, end: usize, dim: i32) -> Result<RecordBatch> {
    let chunks = &index.chunks[start..end];
    let ids: Vec<String> = chunks.iter().map(|c| format!("{}:{}", c.source_label, c.chunk_index)).collect();
    let labels: Vec<&str> = chunks.iter().map(|c| c.source_label.as_str()).collect();
    let chunk_indices = chunks
        .iter()
        .map(|c| i32::try_from(c.chunk_index))
        .collect::<std::result::Result<Vec<i32>, _>>()
        .map_err(|e| Error::Storage(format!("chunk index out of range: {e}")))?;
    let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    let vectors = index.vectors[start..end].iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));

    RecordBatch::try_new(
        build_chunk_schema(dim),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(labels)),
            Arc::new(Int32Array::from(chunk_indices)),
            Arc::new(StringArray::from(contents)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim)),
        ],
    )
    .map_err(|e| Error::Storage(format!("assemble record batch: {e}")))
}
