use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use docqa_core::{Error, Result};

const PAD_ID: u32 = 1;

/// Tokenizes a batch and pads it to its longest member.
///
/// Any input longer than `max_len` tokens is an error; nothing is truncated.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let mut rows = Vec::with_capacity(texts.len());
    for (i, text) in texts.iter().enumerate() {
        let enc = tokenizer.encode(text.as_str(), true).map_err(|e| Error::Embedding(format!("Tokenization failed: {}", e)))?;
        let ids = enc.get_ids().to_vec();
        if ids.len() > max_len {
            return Err(Error::Embedding(format!(
                "input {} has {} tokens, model accepts at most {}",
                i,
                ids.len(),
                max_len
            )));
        }
        rows.push((ids, enc.get_attention_mask().to_vec()));
    }
    let width = rows.iter().map(|(ids, _)| ids.len()).max().unwrap_or(0).max(1);
    let mut all_ids = Vec::with_capacity(rows.len() * width);
    let mut all_mask = Vec::with_capacity(rows.len() * width);
    for (mut ids, mut mask) in rows {
        let pad = width - ids.len();
        ids.extend(std::iter::repeat(PAD_ID).take(pad));
        mask.extend(std::iter::repeat(0).take(pad));
        all_ids.extend(ids);
        all_mask.extend(mask);
    }
    let batch = texts.len();
    let to_err = |e: candle_core::Error| Error::Embedding(e.to_string());
    let input_ids = Tensor::from_iter(all_ids, device).and_then(|t| t.reshape((batch, width))).map_err(to_err)?;
    let attention_mask = Tensor::from_iter(all_mask, device).and_then(|t| t.reshape((batch, width))).map_err(to_err)?;
    Ok((input_ids, attention_mask))
}
