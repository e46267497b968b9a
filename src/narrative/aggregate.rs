// Document-level aggregation of occurrence embeddings.

use std::collections::HashMap;

use crate::vector::mean_vector;

use super::occurrence::Occurrence;

/// Mean contextual embedding of one target word within one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentVector {
    pub document_id: String,
    pub target_word: String,
    /// Metadata of the first contributing occurrence.
    pub year: Option<i32>,
    pub period: Option<String>,
    pub vector: Vec<f64>,
    pub occurrence_count: usize,
}

/// Group pooled occurrence embeddings by document and average them.
///
/// Every pair counts once, whatever its position in the document. Documents
/// come out in the order their first occurrence appears in `pairs`.
pub fn aggregate_by_document(
    target_word: &str,
    pairs: &[(Occurrence<'_>, Vec<f64>)],
) -> Vec<DocumentVector> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();

    for (idx, (occ, _)) in pairs.iter().enumerate() {
        let id = occ.document_id();
        groups
            .entry(id)
            .or_insert_with(|| {
                order.push(id);
                Vec::new()
            })
            .push(idx);
    }

    order
        .into_iter()
        .filter_map(|id| {
            let members = &groups[id];
            let first = &pairs[members[0]].0;
            let vector = mean_vector(members.iter().map(|&i| pairs[i].1.as_slice()))?;

            Some(DocumentVector {
                document_id: id.to_string(),
                target_word: target_word.to_string(),
                year: first.document.year,
                period: first.document.period.clone(),
                vector,
                occurrence_count: members.len(),
            })
        })
        .collect()
}
