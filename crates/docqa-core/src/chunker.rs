//! Splits documents into overlapping, size-bounded chunks.
//!
//! Positions are counted in characters (Unicode scalar values). Within each
//! window the chunker cuts after the most natural separator it can find and
//! falls back to a hard cut only when none fits. Consecutive chunks of the
//! same document share exactly `overlap` characters, so dropping the first
//! `overlap` characters of every chunk but the first and concatenating gives
//! the document back (see [`reconstruct`]).
use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::{Chunk, Document};

/// Separators in order of preference: paragraph, line, sentence, word.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", " "];

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Default for Chunker {
    fn default() -> Self {
        Self { config: ChunkingConfig::default() }
    }
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for doc in documents {
            let before = chunks.len();
            chunks.extend(self.split_text(&doc.content).into_iter().enumerate().map(|(chunk_index, content)| Chunk {
                content,
                source_label: doc.source_label.clone(),
                chunk_index,
            }));
            tracing::debug!(source = %doc.source_label, chunks = chunks.len() - before, "chunked document");
        }
        chunks
    }

    /// Blank text yields no chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        // bounds[i] is the byte offset of char i; bounds[n] == text.len()
        let bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let n = bounds.len() - 1;
        let ChunkingConfig { max_length, overlap } = self.config;

        let mut pieces = Vec::new();
        let mut start = 0usize;
        loop {
            let limit = (start + max_length).min(n);
            if limit == n {
                pieces.push(text[bounds[start]..].to_string());
                break;
            }
            let end = self.find_cut(text, &bounds, start, limit);
            pieces.push(text[bounds[start]..bounds[end]].to_string());
            start = end - overlap;
        }
        pieces
    }

    /// Char position to cut at within `(start + overlap, limit]`.
    fn find_cut(&self, text: &str, bounds: &[usize], start: usize, limit: usize) -> usize {
        let window = &text[bounds[start]..bounds[limit]];
        for sep in SEPARATORS {
            let Some(pos) = window.rfind(sep) else { continue };
            let end_byte = bounds[start] + pos + sep.len();
            // rfind returns the latest occurrence; an earlier one cannot qualify either
            if let Ok(end) = bounds.binary_search(&end_byte) {
                if end - start > self.config.overlap {
                    return end;
                }
            }
        }
        limit
    }
}

/// Reassemble a document from its chunks by dropping each chunk's leading overlap.
pub fn reconstruct(chunks: &[String], overlap: usize) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            out.push_str(chunk);
        } else {
            out.extend(chunk.chars().skip(overlap));
        }
    }
    out
}
