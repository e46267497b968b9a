// Narrative bias score against the two reference anchors.
//
//   bias = (sim_personal - sim_structural) / (sim_personal + sim_structural)
//
// Positive values lean toward the personal/individual pole, negative values
// toward the structural/macro pole. When the denominator is within EPSILON
// of zero the score is 0.0. The ratio is clamped to [-1, 1] because signed
// cosine similarities of opposite sign can push it outside that range.

use serde::{Deserialize, Serialize};

use super::aggregate::DocumentVector;
use super::anchors::ReferenceAnchors;
use crate::vector::cosine_similarity;

/// Denominator magnitude below which the score is defined as 0.0.
pub const EPSILON: f64 = 1e-6;

/// One scored document for one target word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasRecord {
    pub target_word: String,
    pub document_id: String,
    pub year: Option<i32>,
    pub period: Option<String>,
    pub similarity_personal: f64,
    pub similarity_structural: f64,
    pub bias_score: f64,
    /// How many occurrences contributed to the document vector.
    pub occurrences: usize,
}

/// Normalized signed difference of two similarities.
pub fn narrative_bias(sim_personal: f64, sim_structural: f64) -> f64 {
    let denominator = sim_personal + sim_structural;
    if denominator.abs() <= EPSILON {
        return 0.0;
    }
    ((sim_personal - sim_structural) / denominator).clamp(-1.0, 1.0)
}

/// Score a document vector against both anchors.
pub fn score_document(doc: &DocumentVector, anchors: &ReferenceAnchors) -> BiasRecord {
    let sim_personal = cosine_similarity(&doc.vector, &anchors.personal.vector);
    let sim_structural = cosine_similarity(&doc.vector, &anchors.structural.vector);

    BiasRecord {
        target_word: doc.target_word.clone(),
        document_id: doc.document_id.clone(),
        year: doc.year,
        period: doc.period.clone(),
        similarity_personal: sim_personal,
        similarity_structural: sim_structural,
        bias_score: narrative_bias(sim_personal, sim_structural),
        occurrences: doc.occurrence_count,
    }
}
