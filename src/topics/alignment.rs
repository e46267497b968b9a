// Topic evolution: align the topics of two periods.
//
// Rows of the similarity matrix are period-1 topics and columns are period-2
// topics, both in ascending id order. The Hungarian solver picks the
// one-to-one matching with the largest total similarity; a pair is kept only
// if its own similarity reaches the threshold. Whatever is left over is
// classified as disappeared (period 1) or emerged (period 2).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::hungarian::solve_assignment;
use super::traits::TopicModel;
use crate::vector::cosine_similarity;

/// A matched pair of topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedPair {
    pub topic_id_period1: i64,
    pub topic_id_period2: i64,
    pub similarity: f64,
}

/// Full alignment result. Every topic id of either period appears in
/// exactly one place: a matched pair, `disappeared` or `emerged`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicAlignment {
    pub matched: Vec<AlignedPair>,
    pub disappeared: Vec<i64>,
    pub emerged: Vec<i64>,
}

/// Kind of change between the periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Aligned,
    Disappeared,
    Emerging,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Aligned => "Aligned",
            ChangeType::Disappeared => "Disappeared",
            ChangeType::Emerging => "Emerging",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the topic evolution table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionRow {
    pub change_type: ChangeType,
    pub topic_label_p1: String,
    pub keywords_p1: String,
    pub topic_label_p2: String,
    pub keywords_p2: String,
    /// Only set for aligned rows.
    pub similarity: Option<f64>,
}

/// Pairwise cosine similarity between two embedding lists.
pub fn similarity_matrix(rows: &[&[f64]], cols: &[&[f64]]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|r| cols.iter().map(|c| cosine_similarity(r, c)).collect())
        .collect()
}

/// Align two id lists given their similarity matrix.
///
/// `similarity[i][j]` is the similarity of `ids1[i]` and `ids2[j]`.
pub fn align_from_similarity(
    ids1: &[i64],
    ids2: &[i64],
    similarity: &[Vec<f64>],
    threshold: f64,
) -> Result<TopicAlignment> {
    if similarity.len() != ids1.len() || similarity.iter().any(|r| r.len() != ids2.len()) {
        anyhow::bail!(
            "Similarity matrix does not match topic counts ({} x {})",
            ids1.len(),
            ids2.len()
        );
    }

    let pairs = if ids1.is_empty() || ids2.is_empty() {
        Vec::new()
    } else {
        let cost: Vec<Vec<f64>> = similarity
            .iter()
            .map(|r| r.iter().map(|s| -s).collect())
            .collect();
        solve_assignment(&cost)?
    };

    let mut matched_rows = vec![false; ids1.len()];
    let mut matched_cols = vec![false; ids2.len()];
    let mut matched = Vec::new();

    for (r, c) in pairs {
        let sim = similarity[r][c];
        if sim >= threshold {
            matched_rows[r] = true;
            matched_cols[c] = true;
            matched.push(AlignedPair {
                topic_id_period1: ids1[r],
                topic_id_period2: ids2[c],
                similarity: sim,
            });
        } else {
            debug!(
                topic1 = ids1[r],
                topic2 = ids2[c],
                similarity = sim,
                "Assignment pair below threshold"
            );
        }
    }

    let disappeared = ids1
        .iter()
        .zip(&matched_rows)
        .filter(|(_, &m)| !m)
        .map(|(&id, _)| id)
        .collect();
    let emerged = ids2
        .iter()
        .zip(&matched_cols)
        .filter(|(_, &m)| !m)
        .map(|(&id, _)| id)
        .collect();

    Ok(TopicAlignment {
        matched,
        disappeared,
        emerged,
    })
}

/// Align the topics of two fitted models.
pub fn align_topics(
    period1: &dyn TopicModel,
    period2: &dyn TopicModel,
    threshold: f64,
) -> Result<TopicAlignment> {
    let ids1 = period1.topic_ids();
    let ids2 = period2.topic_ids();

    let emb1 = embeddings_for(period1, &ids1)?;
    let emb2 = embeddings_for(period2, &ids2)?;
    check_dimensions(&ids1, &emb1, &ids2, &emb2)?;

    let similarity = similarity_matrix(&emb1, &emb2);
    let alignment = align_from_similarity(&ids1, &ids2, &similarity, threshold)?;

    info!(
        topics_p1 = ids1.len(),
        topics_p2 = ids2.len(),
        aligned = alignment.matched.len(),
        disappeared = alignment.disappeared.len(),
        emerged = alignment.emerged.len(),
        threshold,
        "Aligned topics"
    );

    Ok(alignment)
}

fn embeddings_for<'m>(model: &'m dyn TopicModel, ids: &[i64]) -> Result<Vec<&'m [f64]>> {
    ids.iter()
        .map(|&id| {
            model
                .topic_embedding(id)
                .ok_or_else(|| anyhow::anyhow!("Topic {id} has no embedding"))
        })
        .collect()
}

/// Both periods must share one embedding space.
fn check_dimensions(ids1: &[i64], emb1: &[&[f64]], ids2: &[i64], emb2: &[&[f64]]) -> Result<()> {
    let labelled = ids1
        .iter()
        .zip(emb1)
        .map(|(id, e)| (1u8, *id, e.len()))
        .chain(ids2.iter().zip(emb2).map(|(id, e)| (2, *id, e.len())));

    let mut expected: Option<(u8, i64, usize)> = None;
    for (period, id, dim) in labelled {
        match expected {
            None => expected = Some((period, id, dim)),
            Some((first_period, first_id, d)) if d != dim => anyhow::bail!(
                "Topic {id} of period {period} has embedding dimension {dim}, \
                 but topic {first_id} of period {first_period} has {d}; \
                 both periods must use the same embedding model"
            ),
            Some(_) => {}
        }
    }
    Ok(())
}

/// Build the evolution table: aligned rows first, then disappeared, then
/// emerging, each carrying the top `top_k` keywords of its topics.
pub fn evolution_rows(
    alignment: &TopicAlignment,
    period1: &dyn TopicModel,
    period2: &dyn TopicModel,
    top_k: usize,
) -> Vec<EvolutionRow> {
    let words = |model: &dyn TopicModel, id: i64| model.top_keywords(id, top_k).join(" | ");

    let aligned = alignment.matched.iter().map(|pair| EvolutionRow {
        change_type: ChangeType::Aligned,
        topic_label_p1: format!("T1_{}", pair.topic_id_period1),
        keywords_p1: words(period1, pair.topic_id_period1),
        topic_label_p2: format!("T2_{}", pair.topic_id_period2),
        keywords_p2: words(period2, pair.topic_id_period2),
        similarity: Some(pair.similarity),
    });

    let disappeared = alignment.disappeared.iter().map(|&id| EvolutionRow {
        change_type: ChangeType::Disappeared,
        topic_label_p1: format!("T1_{id}"),
        keywords_p1: words(period1, id),
        topic_label_p2: String::new(),
        keywords_p2: String::new(),
        similarity: None,
    });

    let emerged = alignment.emerged.iter().map(|&id| EvolutionRow {
        change_type: ChangeType::Emerging,
        topic_label_p1: String::new(),
        keywords_p1: String::new(),
        topic_label_p2: format!("T2_{id}"),
        keywords_p2: words(period2, id),
        similarity: None,
    });

    aligned.chain(disappeared).chain(emerged).collect()
}
