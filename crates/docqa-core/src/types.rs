//! Domain types shared by the chunker, the vector index and the retrieval gate.

use serde::{Deserialize, Serialize};

/// A raw text document handed over by a [`DocumentSource`](crate::traits::DocumentSource).
///
/// Documents only live for one ingestion run; they are consumed by the
/// chunker and never persisted themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub source_label: String,
}

impl Document {
    pub fn new(content: impl Into<String>, source_label: impl Into<String>) -> Self {
        Self { content: content.into(), source_label: source_label.into() }
    }

    /// First `max_chars` characters of the content, with `...` appended when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        match self.content.char_indices().nth(max_chars) {
            Some((end, _)) => format!("{}...", &self.content[..end]),
            None => self.content.clone(),
        }
    }
}

/// A bounded fragment of one document; the unit of indexing and retrieval.
///
/// - `content`: at most `chunking.max_length` characters
/// - `source_label`: label of the originating document
/// - `chunk_index`: 0-based position within that document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub source_label: String,
    pub chunk_index: usize,
}

/// One search result. `score` is a similarity on `[0, 1]`; higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub score: f32,
}

/// What the retrieval gate hands back for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub response: String,
    pub matched: Option<Chunk>,
}

/// Wire shape of the `ask` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    pub question: String,
    pub response: String,
}
