// Contextual embedding of occurrences, one oracle call per batch.
//
// For every occurrence the context window goes through the encoder, the
// target word's sub-tokens are located inside the encoded window, and their
// hidden states are averaged. An occurrence whose target tokens cannot be
// found (truncation, different segmentation in context) is kept in the
// output as `Missing` so that results stay index-aligned with the input.

use std::ops::Range;

use anyhow::Result;
use tracing::debug;

use super::occurrence::{Occurrence, WindowStrategy};
use crate::oracle::{EmbeddingOracle, EncodedSequence};
use crate::vector::{mean_rows, mean_vector};

/// Which token rows of the encoded window form the occurrence embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pooling {
    /// Mean of the rows covering the target word's sub-tokens.
    #[default]
    TargetSpan,
    /// Mean of every non-special row of the window.
    Context,
}

/// Why an occurrence has no embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingReason {
    /// The target word tokenizes to nothing.
    EmptyTargetTokens,
    /// The target token sequence is not a contiguous run in the window.
    SpanNotFound,
    /// The encoder returned no usable content rows.
    EmptyEncoding,
}

/// Per-occurrence result of the batcher.
#[derive(Debug, Clone, PartialEq)]
pub enum OccurrenceEmbedding {
    Pooled(Vec<f64>),
    Missing(MissingReason),
}

impl OccurrenceEmbedding {
    pub fn is_missing(&self) -> bool {
        matches!(self, OccurrenceEmbedding::Missing(_))
    }
}

/// Locate the target tokens inside an encoded sequence.
///
/// The search starts after the leading special tokens and returns the
/// leftmost contiguous match as absolute positions in `sequence`.
pub fn locate_token_span(sequence: &EncodedSequence, target_tokens: &[String]) -> Option<Range<usize>> {
    if target_tokens.is_empty() {
        return None;
    }

    let offset = sequence.leading_special_count();
    let limit = sequence.tokens.len().min(sequence.hidden_states.len());
    if offset >= limit {
        return None;
    }

    sequence.tokens[offset..limit]
        .windows(target_tokens.len())
        .position(|w| w == target_tokens)
        .map(|j| offset + j..offset + j + target_tokens.len())
}

/// Pool one encoded window into an occurrence embedding.
pub fn pool_sequence(
    sequence: &EncodedSequence,
    target_tokens: &[String],
    pooling: Pooling,
) -> OccurrenceEmbedding {
    match pooling {
        Pooling::TargetSpan => {
            if target_tokens.is_empty() {
                return OccurrenceEmbedding::Missing(MissingReason::EmptyTargetTokens);
            }
            match locate_token_span(sequence, target_tokens) {
                Some(span) => match mean_rows(&sequence.hidden_states, span) {
                    Some(v) => OccurrenceEmbedding::Pooled(v),
                    None => OccurrenceEmbedding::Missing(MissingReason::EmptyEncoding),
                },
                None => OccurrenceEmbedding::Missing(MissingReason::SpanNotFound),
            }
        }
        Pooling::Context => {
            let rows = sequence
                .content_positions()
                .map(|i| sequence.hidden_states[i].as_slice());
            match mean_vector(rows) {
                Some(v) => OccurrenceEmbedding::Pooled(v),
                None => OccurrenceEmbedding::Missing(MissingReason::EmptyEncoding),
            }
        }
    }
}

/// Embed one batch of occurrences of the same target word.
///
/// All windows go to the oracle in a single call. The result has exactly
/// one entry per input occurrence, in input order.
pub async fn embed_batch(
    oracle: &dyn EmbeddingOracle,
    occurrences: &[Occurrence<'_>],
    target_tokens: &[String],
    window: WindowStrategy,
    pooling: Pooling,
) -> Result<Vec<OccurrenceEmbedding>> {
    if occurrences.is_empty() {
        return Ok(Vec::new());
    }

    let windows: Vec<String> = occurrences
        .iter()
        .map(|occ| occ.context_window(window).to_string())
        .collect();

    let encoded = oracle.encode(&windows).await?;

    if encoded.len() != windows.len() {
        anyhow::bail!(
            "Encoder returned {} sequences for a batch of {}",
            encoded.len(),
            windows.len()
        );
    }

    let embeddings: Vec<OccurrenceEmbedding> = encoded
        .iter()
        .map(|seq| pool_sequence(seq, target_tokens, pooling))
        .collect();

    debug!(
        batch = occurrences.len(),
        missing = embeddings.iter().filter(|e| e.is_missing()).count(),
        "Embedded occurrence batch"
    );

    Ok(embeddings)
}
