use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

use docqa_core::traits::Embedder;
use docqa_core::{Error, Result};

/// Feature-hashing embedder: lowercase word tokens are hashed into `dim`
/// buckets and the counts are L2-normalised.
///
/// Needs no model files, so it backs development setups and tests. Texts
/// sharing vocabulary score high; paraphrases with no common words do not.
///
/// Text without any word (`-----`, `???`) falls back to its symbols as
/// tokens, and blank text to a fixed sentinel bucket, so every input embeds.
pub struct HashEmbedder {
    dim: usize,
    max_len: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize, max_len: usize) -> Self {
        Self { dim, max_len, id: format!("hash-xxh64:d{dim}") }
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        let mut tokens: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).collect();
        if tokens.is_empty() {
            tokens = lower.split_whitespace().flat_map(symbol_tokens).collect();
        }
        if tokens.is_empty() {
            tokens.push(BLANK_TOKEN);
        }
        if tokens.len() > self.max_len {
            return Err(Error::Embedding(format!("text has {} tokens, limit is {}", tokens.len(), self.max_len)));
        }
        let mut v = vec![0f32; self.dim];
        for token in tokens {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let idx = (hasher.finish() % self.dim as u64) as usize;
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}

const BLANK_TOKEN: &str = "\u{0}";

fn symbol_tokens(word: &str) -> impl Iterator<Item = &str> {
    word.char_indices().map(move |(i, c)| &word[i..i + c.len_utf8()])
}

impl Embedder for HashEmbedder {
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
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}
