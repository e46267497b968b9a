// Local ONNX contextual encoder (BERT-style, e.g. bert-base-chinese).
//
// Runs the exported transformer on the CPU and returns the last hidden state
// for every token of every input. Unlike a sentence embedder, nothing is
// pooled here: the narrative pipeline decides which token rows to average
// (the target-word span, or the whole context).
//
// Expected files in the model directory: `model.onnx` (inputs input_ids,
// attention_mask, token_type_ids; first output last_hidden_state of shape
// [batch, seq_len, hidden]) and `tokenizer.json`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use super::traits::{EmbeddingOracle, EncodedSequence};

/// File names expected inside the model directory.
pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Check whether both required encoder files exist.
pub fn model_files_present(dir: &Path) -> bool {
    dir.join(MODEL_FILE).exists() && dir.join(TOKENIZER_FILE).exists()
}

/// Contextual encoder backed by a local ONNX session.
///
/// Arc<Mutex<Session>> because `Session::run` takes `&mut self` and the
/// inference closure has to be `'static` for spawn_blocking.
pub struct OnnxEncoder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    pad_id: u32,
    max_batch_size: usize,
}

impl OnnxEncoder {
    /// Load the encoder and tokenizer from `model_dir`.
    ///
    /// Inputs longer than `max_seq_len` tokens (special tokens included) are
    /// truncated by the tokenizer before inference.
    pub fn load(model_dir: &Path, max_seq_len: usize, max_batch_size: usize) -> Result<Self> {
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Encoder model not found: {}\nExport the encoder to ONNX and set FRAMELENS_MODEL_DIR.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Encoder tokenizer not found: {}\nPlace tokenizer.json next to the model.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load encoder from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_seq_len,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

        debug!(
            model_dir = %model_dir.display(),
            max_seq_len,
            "Loaded ONNX encoder"
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            pad_id,
            max_batch_size: max_batch_size.max(1),
        })
    }
}

#[async_trait]
impl EmbeddingOracle for OnnxEncoder {
    /// Tokenization and inference are CPU-bound, so they run on a blocking
    /// thread and the caller simply awaits the finished batch.
    async fn encode(&self, texts: &[String]) -> Result<Vec<EncodedSequence>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let texts = texts.to_vec();
        let pad_id = self.pad_id;

        tokio::task::spawn_blocking(move || encode_sync(&session, &tokenizer, &texts, pad_id))
            .await
            .context("spawn_blocking panicked")?
    }

    fn tokenize(&self, word: &str) -> Result<Vec<String>> {
        let encoding = self
            .tokenizer
            .encode(word, false)
            .map_err(|e| anyhow::anyhow!("Tokenization failed for {word:?}: {}", e))?;
        Ok(encoding.get_tokens().to_vec())
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}

/// Synchronous encode: tokenize, right-pad, run one forward pass, then cut
/// the flat output back into per-input token rows (padding dropped).
fn encode_sync(
    session: &Arc<Mutex<Session>>,
    tokenizer: &Arc<Tokenizer>,
    texts: &[String],
    pad_id: u32,
) -> Result<Vec<EncodedSequence>> {
    let encodings: Vec<_> = texts
        .iter()
        .map(|t| {
            tokenizer
                .encode(t.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
        })
        .collect::<Result<Vec<_>>>()?;

    let batch_size = encodings.len();
    let max_len = encodings
        .iter()
        .map(|e| e.get_ids().len())
        .max()
        .unwrap_or(0);

    if max_len == 0 {
        return Ok(vec![EncodedSequence::default(); batch_size]);
    }

    // input_ids padded with the pad token, attention_mask 0 on padding,
    // token_type_ids all zero for single-segment input.
    let mut input_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    let mut attention_mask_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    let mut token_type_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);

    for enc in &encodings {
        let ids = enc.get_ids();
        let mask = enc.get_attention_mask();
        let seq_len = ids.len();

        input_ids_flat.extend(ids.iter().map(|&id| id as i64));
        attention_mask_flat.extend(mask.iter().map(|&m| m as i64));
        token_type_ids_flat.extend(std::iter::repeat_n(0i64, seq_len));

        let pad_len = max_len - seq_len;
        input_ids_flat.extend(std::iter::repeat_n(pad_id as i64, pad_len));
        attention_mask_flat.extend(std::iter::repeat_n(0i64, pad_len));
        token_type_ids_flat.extend(std::iter::repeat_n(0i64, pad_len));
    }

    let shape = [batch_size as i64, max_len as i64];

    let input_ids_tensor =
        Tensor::from_array((shape, input_ids_flat)).context("Failed to create input_ids tensor")?;
    let attention_mask_tensor = Tensor::from_array((shape, attention_mask_flat))
        .context("Failed to create attention_mask tensor")?;
    let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids_flat))
        .context("Failed to create token_type_ids tensor")?;

    // last_hidden_state: [batch, max_len, hidden]
    let (hidden_dim, hidden_states) = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            })
            .context("Encoder ONNX inference failed")?;

        let (out_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract hidden state tensor")?;

        let dims: Vec<i64> = out_shape.iter().copied().collect();
        if dims.len() != 3 || dims[0] as usize != batch_size || dims[1] as usize != max_len {
            anyhow::bail!(
                "Unexpected hidden state shape {:?} for batch [{}, {}]",
                dims,
                batch_size,
                max_len
            );
        }

        (dims[2] as usize, data.to_vec())
    };

    let mut sequences = Vec::with_capacity(batch_size);

    for (i, enc) in encodings.iter().enumerate() {
        let seq_len = enc.get_ids().len();
        let hidden_rows = (0..seq_len)
            .map(|j| {
                let offset = (i * max_len + j) * hidden_dim;
                hidden_states[offset..offset + hidden_dim]
                    .iter()
                    .map(|&x| x as f64)
                    .collect()
            })
            .collect();

        sequences.push(EncodedSequence {
            tokens: enc.get_tokens().to_vec(),
            special_mask: enc.get_special_tokens_mask().iter().map(|&m| m != 0).collect(),
            hidden_states: hidden_rows,
        });
    }

    debug!(batch_size, max_len, hidden_dim, "Encoded batch");

    Ok(sequences)
}
