// Fitted topic models loaded from JSON exports.
//
// Export format:
//
//   {
//     "outlier_id": -1,
//     "topics": [
//       {"id": 0, "count": 42, "embedding": [...], "keywords": [["word", 0.12], ...]},
//       ...
//     ]
//   }
//
// The outlier cluster may be present in the export; it is filtered out of
// every view the aligner sees.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::traits::TopicModel;

fn default_outlier_id() -> i64 {
    -1
}

/// One topic cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    /// Number of documents assigned to the topic, when the export has it.
    #[serde(default)]
    pub count: Option<u64>,
    pub embedding: Vec<f64>,
    /// Ranked keywords, best first.
    #[serde(default)]
    pub keywords: Vec<(String, f64)>,
}

/// A fitted topic model for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTopics {
    #[serde(default = "default_outlier_id")]
    pub outlier_id: i64,
    pub topics: Vec<Topic>,
}

impl FittedTopics {
    pub fn new(topics: Vec<Topic>) -> Self {
        Self {
            outlier_id: default_outlier_id(),
            topics,
        }
    }

    /// Load and validate an exported topic model.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read topic model {}", path.display()))?;
        let model: FittedTopics = serde_json::from_str(&content)
            .with_context(|| format!("Invalid topic model {}", path.display()))?;
        model
            .validate()
            .with_context(|| format!("Invalid topic model {}", path.display()))?;

        info!(
            path = %path.display(),
            topics = model.topic_ids().len(),
            "Loaded topic model"
        );
        Ok(model)
    }

    /// Topic ids must be unique and all embeddings must share one dimension.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        let mut dim: Option<usize> = None;

        for topic in self.topics.iter().filter(|t| t.id != self.outlier_id) {
            if !seen.insert(topic.id) {
                anyhow::bail!("Duplicate topic id {}", topic.id);
            }
            match dim {
                None => dim = Some(topic.embedding.len()),
                Some(d) if d != topic.embedding.len() => anyhow::bail!(
                    "Topic {} has embedding dimension {}, expected {}",
                    topic.id,
                    topic.embedding.len(),
                    d
                ),
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn topic(&self, id: i64) -> Option<&Topic> {
        if id == self.outlier_id {
            return None;
        }
        self.topics.iter().find(|t| t.id == id)
    }

    /// Print each topic's top keywords.
    pub fn display_keywords(&self, period_name: &str, k: usize) {
        println!(
            "\n{}",
            format!("=== {period_name} Keywords (Top {k}) ===").bold()
        );

        let by_id: BTreeMap<i64, &Topic> = self
            .topics
            .iter()
            .filter(|t| t.id != self.outlier_id)
            .map(|t| (t.id, t))
            .collect();

        if by_id.is_empty() {
            println!("  {}", "No topics (outlier cluster only).".dimmed());
            return;
        }

        for (id, topic) in by_id {
            let docs = topic
                .count
                .map(|c| format!(" (Docs: {c})"))
                .unwrap_or_default();
            let words = topic
                .keywords
                .iter()
                .take(k)
                .map(|(w, score)| format!("{w} ({score:.3})"))
                .collect::<Vec<_>>()
                .join(" | ");
            println!("  {}{}: {}", format!("Topic {id}").bold(), docs, words.dimmed());
        }
    }
}

impl TopicModel for FittedTopics {
    fn topic_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .topics
            .iter()
            .map(|t| t.id)
            .filter(|&id| id != self.outlier_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn topic_embedding(&self, id: i64) -> Option<&[f64]> {
        self.topic(id).map(|t| t.embedding.as_slice())
    }

    fn topic_keywords(&self, id: i64) -> Option<&[(String, f64)]> {
        self.topic(id).map(|t| t.keywords.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(id: i64, keywords: &[&str]) -> Topic {
        Topic {
            id,
            count: None,
            embedding: vec![1.0, 0.0],
            keywords: keywords
                .iter()
                .enumerate()
                .map(|(i, w)| (w.to_string(), 1.0 / (i + 1) as f64))
                .collect(),
        }
    }

    #[test]
    fn test_topic_ids_sorted_without_outlier() {
        let model = FittedTopics::new(vec![topic(2, &[]), topic(-1, &[]), topic(0, &[])]);
        assert_eq!(model.topic_ids(), vec![0, 2]);
        assert!(model.topic_embedding(-1).is_none());
    }

    #[test]
    fn test_top_keywords_truncates() {
        let model = FittedTopics::new(vec![topic(0, &["a", "b", "c"])]);
        assert_eq!(model.top_keywords(0, 2), vec!["a", "b"]);
        assert_eq!(model.top_keywords(0, 10), vec!["a", "b", "c"]);
        assert!(model.top_keywords(7, 3).is_empty());
    }

    #[test]
    fn test_parse_export_format() {
        let json = r#"{"topics": [
            {"id": -1, "embedding": [0.0, 0.0], "keywords": []},
            {"id": 0, "count": 12, "embedding": [0.5, 0.5], "keywords": [["改革", 0.3], ["政策", 0.2]]}
        ]}"#;
        let model: FittedTopics = serde_json::from_str(json).unwrap();
        assert_eq!(model.outlier_id, -1);
        assert_eq!(model.topic_ids(), vec![0]);
        assert_eq!(model.top_keywords(0, 1), vec!["改革"]);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_ragged_dims() {
        let dup = FittedTopics::new(vec![topic(1, &[]), topic(1, &[])]);
        assert!(dup.validate().is_err());

        let mut ragged = FittedTopics::new(vec![topic(0, &[]), topic(1, &[])]);
        ragged.topics[1].embedding = vec![1.0, 2.0, 3.0];
        assert!(ragged.validate().is_err());
    }
}
