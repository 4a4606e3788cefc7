use crate::error::Result;
use crate::types::Document;

/// Maps text onto a fixed-width vector.
///
/// `embed_batch` must give the same vectors, in the same order, as calling
/// `embed` on each text. Implementations signal oversized or unusable input
/// with [`Error::Embedding`](crate::error::Error::Embedding) instead of truncating.
pub trait Embedder: Send + Sync {
    /// Identity of the scheme, recorded next to every persisted index.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed_batch(&[text.to_string()])?;
        out.pop().ok_or_else(|| crate::error::Error::Embedding("embedder returned no vector".into()))
    }
}

/// Supplies the documents an index is built from.
///
/// Transport or auth failures are not propagated: the source logs them and
/// returns an empty sequence, which callers treat as "nothing to index".
pub trait DocumentSource: Send + Sync {
    fn fetch_documents(&self) -> Vec<Document>;
}

impl<T: DocumentSource + ?Sized> DocumentSource for Box<T> {
    fn fetch_documents(&self) -> Vec<Document> {
        (**self).fetch_documents()
    }
}

impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }
    fn dim(&self) -> usize {
        (**self).dim()
    }
    fn max_len(&self) -> usize {
        (**self).max_len()
    }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}
