// Narrative bias pipeline for one target word.
//
//   extract occurrences -> embed in batches -> drop missing
//     -> aggregate per document -> score against anchors
//
// Everything the stages need travels in an AnalysisContext built once per
// run. Skipped data never aborts the run; it shows up in WordStats instead.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use super::aggregate::aggregate_by_document;
use super::anchors::ReferenceAnchors;
use super::batcher::{embed_batch, OccurrenceEmbedding, Pooling};
use super::bias::{score_document, BiasRecord};
use super::occurrence::{extract_occurrences, WindowStrategy};
use crate::corpus::Document;
use crate::oracle::EmbeddingOracle;

/// Tunable parameters of the narrative pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeParams {
    pub window: WindowStrategy,
    pub pooling: Pooling,
    /// Occurrences per oracle call (capped by the oracle's own limit).
    pub batch_size: usize,
    pub show_progress: bool,
}

impl Default for NarrativeParams {
    fn default() -> Self {
        Self {
            window: WindowStrategy::default(),
            pooling: Pooling::default(),
            batch_size: 32,
            show_progress: false,
        }
    }
}

/// Read-only state shared by every stage of a run.
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub oracle: &'a dyn EmbeddingOracle,
    pub anchors: &'a ReferenceAnchors,
    pub params: &'a NarrativeParams,
}

impl AnalysisContext<'_> {
    fn effective_batch_size(&self) -> usize {
        self.params
            .batch_size
            .clamp(1, self.oracle.max_batch_size().max(1))
    }
}

/// Counts for one target word, so that reduced output can be told apart
/// from "no bias".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordStats {
    pub target_word: String,
    pub documents_matched: usize,
    pub occurrences: usize,
    pub missing_embeddings: usize,
    pub documents_scored: usize,
}

impl WordStats {
    /// Documents that contained the word but produced no record.
    pub fn documents_dropped(&self) -> usize {
        self.documents_matched.saturating_sub(self.documents_scored)
    }
}

/// Records and statistics for one target word.
#[derive(Debug, Clone, Default)]
pub struct WordReport {
    pub stats: WordStats,
    pub records: Vec<BiasRecord>,
}

/// Sub-tokens to locate in each window. `None` when span pooling needs
/// tokens and the word has none; context pooling never needs them.
fn target_tokens(ctx: &AnalysisContext<'_>, target_word: &str) -> Option<Vec<String>> {
    if ctx.params.pooling == Pooling::Context {
        return Some(Vec::new());
    }
    match ctx.oracle.tokenize(target_word) {
        Ok(tokens) if !tokens.is_empty() => Some(tokens),
        Ok(_) => {
            warn!(word = target_word, "Target word produced no tokens");
            None
        }
        Err(e) => {
            warn!(word = target_word, error = %e, "Target word failed to tokenize");
            None
        }
    }
}

fn progress_bar(len: usize, target_word: &str, visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(ProgressStyle::with_template(
        "  {msg} [{bar:30}] {pos}/{len} occurrences ({eta})",
    )?);
    pb.set_message(target_word.to_string());
    Ok(pb)
}

/// Run the full pipeline for one target word over the corpus.
///
/// An oracle failure aborts this word's run (the batch is the unit of
/// failure). Missing spans, documents without a pooled occurrence and words
/// with no match only reduce the output.
pub async fn analyze_word(
    ctx: &AnalysisContext<'_>,
    documents: &[Document],
    target_word: &str,
) -> Result<WordReport> {
    let occurrences = extract_occurrences(documents, target_word);

    let mut stats = WordStats {
        target_word: target_word.to_string(),
        occurrences: occurrences.len(),
        ..Default::default()
    };

    if occurrences.is_empty() {
        warn!(word = target_word, "Target word not found in corpus");
        return Ok(WordReport {
            stats,
            records: Vec::new(),
        });
    }

    let mut matched: Vec<&str> = occurrences.iter().map(|o| o.document_id()).collect();
    matched.dedup();
    stats.documents_matched = matched.len();

    info!(
        word = target_word,
        documents = stats.documents_matched,
        occurrences = stats.occurrences,
        "Found target word occurrences"
    );

    let Some(tokens) = target_tokens(ctx, target_word) else {
        stats.missing_embeddings = stats.occurrences;
        warn!(
            word = target_word,
            missing = stats.missing_embeddings,
            "No target tokens to locate, skipping the encoder for this word"
        );
        return Ok(WordReport {
            stats,
            records: Vec::new(),
        });
    };
    let batch_size = ctx.effective_batch_size();
    let pb = progress_bar(occurrences.len(), target_word, ctx.params.show_progress)?;

    let mut pooled = Vec::with_capacity(occurrences.len());

    for batch in occurrences.chunks(batch_size) {
        let embeddings = embed_batch(
            ctx.oracle,
            batch,
            &tokens,
            ctx.params.window,
            ctx.params.pooling,
        )
        .await?;

        for (occ, embedding) in batch.iter().zip(embeddings) {
            match embedding {
                OccurrenceEmbedding::Pooled(v) => pooled.push((*occ, v)),
                OccurrenceEmbedding::Missing(_) => stats.missing_embeddings += 1,
            }
        }
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();

    let doc_vectors = aggregate_by_document(target_word, &pooled);
    drop(pooled);

    let records: Vec<BiasRecord> = doc_vectors
        .iter()
        .map(|dv| score_document(dv, ctx.anchors))
        .collect();
    stats.documents_scored = records.len();

    if stats.missing_embeddings > 0 {
        warn!(
            word = target_word,
            missing = stats.missing_embeddings,
            dropped_documents = stats.documents_dropped(),
            "Some occurrences had no locatable token span"
        );
    }
    if records.is_empty() {
        warn!(word = target_word, "No document could be scored");
    }

    info!(
        word = target_word,
        scored = stats.documents_scored,
        "Scored documents"
    );

    Ok(WordReport { stats, records })
}
