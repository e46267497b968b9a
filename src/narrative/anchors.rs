// Reference anchors: one vector per semantic pole.
//
// Each pole is described by a seed-word list. Every distinct seed word is
// encoded once (seeds shared by both poles are not encoded twice), reduced
// to the mean of its non-special token rows, and each pole's anchor is the
// mean of its seeds' vectors in list order. Anchors are built once at
// startup and only read afterwards.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::oracle::{EmbeddingOracle, EncodedSequence};
use crate::vector::mean_vector;

/// Seed words for the two poles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorSeeds {
    #[serde(alias = "individual")]
    pub personal: Vec<String>,
    #[serde(alias = "macro")]
    pub structural: Vec<String>,
}

impl Default for AnchorSeeds {
    fn default() -> Self {
        let personal = ["我", "我们", "个人", "家庭", "经历", "感受", "故事", "情感", "内心", "自我"];
        let structural = ["社会", "国家", "集体", "制度", "结构", "公共", "历史", "发展", "公众", "体系"];
        Self {
            personal: personal.iter().map(|s| s.to_string()).collect(),
            structural: structural.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AnchorSeeds {
    /// Load seeds from a JSON file of the form
    /// `{"personal": [...], "structural": [...]}`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid seed file {}", path.display()))
    }

    /// Distinct seed words across both poles, first-seen order.
    pub fn distinct_words(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.personal
            .iter()
            .chain(self.structural.iter())
            .map(String::as_str)
            .filter(|w| seen.insert(*w))
            .collect()
    }
}

/// One pole's reference vector and the seeds that built it.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub label: String,
    pub vector: Vec<f64>,
    pub seeds_used: Vec<String>,
    pub seeds_skipped: Vec<String>,
}

/// The pair of anchors every bias score is measured against.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceAnchors {
    pub personal: Anchor,
    pub structural: Anchor,
}

/// Mean of the content-token rows of an encoded seed word.
fn seed_vector(sequence: &EncodedSequence) -> Option<Vec<f64>> {
    mean_vector(
        sequence
            .content_positions()
            .map(|i| sequence.hidden_states[i].as_slice()),
    )
}

fn build_pole(label: &str, seeds: &[String], vectors: &HashMap<&str, Vec<f64>>) -> Result<Anchor> {
    let (used, skipped): (Vec<&String>, Vec<&String>) =
        seeds.iter().partition(|w| vectors.contains_key(w.as_str()));

    let vector = mean_vector(used.iter().map(|w| vectors[w.as_str()].as_slice()));

    let Some(vector) = vector else {
        anyhow::bail!(
            "Reference anchor '{}' has no usable seed words ({} given). \
             Check the seed list and the tokenizer vocabulary.",
            label,
            seeds.len()
        );
    };

    info!(
        pole = label,
        used = used.len(),
        skipped = skipped.len(),
        dim = vector.len(),
        "Built reference anchor"
    );

    Ok(Anchor {
        label: label.to_string(),
        vector,
        seeds_used: used.into_iter().cloned().collect(),
        seeds_skipped: skipped.into_iter().cloned().collect(),
    })
}

/// Build both reference anchors.
///
/// Seeds that tokenize to nothing, or whose encoding has no content rows,
/// are skipped with a warning. A pole left with no usable seed is a
/// configuration error.
pub async fn build_reference_anchors(
    oracle: &dyn EmbeddingOracle,
    seeds: &AnchorSeeds,
    batch_size: usize,
) -> Result<ReferenceAnchors> {
    let mut encodable: Vec<&str> = Vec::new();
    for word in seeds.distinct_words() {
        match oracle.tokenize(word) {
            Ok(tokens) if !tokens.is_empty() => encodable.push(word),
            Ok(_) => warn!(seed = word, "Seed word produced no tokens, skipping"),
            Err(e) => warn!(seed = word, error = %e, "Seed word failed to tokenize, skipping"),
        }
    }

    let batch_size = batch_size.clamp(1, oracle.max_batch_size().max(1));
    let mut vectors: HashMap<&str, Vec<f64>> = HashMap::new();

    for chunk in encodable.chunks(batch_size) {
        let texts: Vec<String> = chunk.iter().map(|w| w.to_string()).collect();
        let encoded = oracle
            .encode(&texts)
            .await
            .context("Failed to encode anchor seed words")?;
        if encoded.len() != chunk.len() {
            anyhow::bail!(
                "Encoder returned {} sequences for {} seed words",
                encoded.len(),
                chunk.len()
            );
        }

        for (word, sequence) in chunk.iter().zip(encoded.iter()) {
            match seed_vector(sequence) {
                Some(v) => {
                    vectors.insert(*word, v);
                }
                None => warn!(seed = *word, "Seed word has no content tokens, skipping"),
            }
        }
    }

    debug!(
        distinct = encodable.len(),
        encoded = vectors.len(),
        "Encoded anchor seeds"
    );

    Ok(ReferenceAnchors {
        personal: build_pole("personal", &seeds.personal, &vectors)?,
        structural: build_pole("structural", &seeds.structural, &vectors)?,
    })
}
