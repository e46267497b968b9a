// Embedding oracle trait: the swap-ready encoder abstraction.
//
// The narrative pipeline never talks to a model directly. It hands batches
// of strings to an EmbeddingOracle and gets back, per string, the token
// sequence the encoder saw plus one hidden-state row per token. The default
// implementation runs a BERT-style ONNX model locally; tests use a
// deterministic character-level fake.

use anyhow::Result;
use async_trait::async_trait;

/// One encoded input: the tokens the encoder produced (after truncation,
/// without padding) and a hidden-state row for each of them.
#[derive(Debug, Clone, Default)]
pub struct EncodedSequence {
    /// Token strings in sequence order, special tokens included.
    pub tokens: Vec<String>,
    /// `true` where the token is a structural token ([CLS], [SEP], ...).
    pub special_mask: Vec<bool>,
    /// Hidden-state vector per token. Same length as `tokens`.
    pub hidden_states: Vec<Vec<f64>>,
}

impl EncodedSequence {
    /// Number of structural tokens the encoder put in front of the content.
    pub fn leading_special_count(&self) -> usize {
        self.special_mask.iter().take_while(|&&s| s).count()
    }

    /// Indices of content (non-special) tokens that have a hidden state.
    pub fn content_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.special_mask
            .iter()
            .enumerate()
            .filter(|(i, &special)| !special && *i < self.hidden_states.len())
            .map(|(i, _)| i)
    }
}

/// Trait for contextual text encoders.
///
/// `encode` is treated as a single blocking unit of work: it either returns
/// a complete, index-aligned batch or fails as a whole.
#[async_trait]
pub trait EmbeddingOracle: Send + Sync {
    /// Encode a batch of texts. The result has one entry per input, in order.
    /// Implementations truncate to their maximum sequence length.
    async fn encode(&self, texts: &[String]) -> Result<Vec<EncodedSequence>>;

    /// Tokenize a single word without special tokens.
    fn tokenize(&self, word: &str) -> Result<Vec<String>>;

    /// Largest batch the encoder accepts in one call.
    fn max_batch_size(&self) -> usize {
        usize::MAX
    }
}
