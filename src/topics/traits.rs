// Topic model trait: read-only view of a fitted topic model.
//
// Topic discovery itself happens elsewhere (clustering over document
// embeddings). The aligner only needs the stable id space, one embedding per
// topic and the model's own keyword ranking.

/// A fitted topic model for one period.
pub trait TopicModel {
    /// Non-outlier topic ids in ascending order.
    fn topic_ids(&self) -> Vec<i64>;

    /// Embedding of a topic, if the id exists.
    fn topic_embedding(&self, id: i64) -> Option<&[f64]>;

    /// Ranked (keyword, weight) list of a topic, best first.
    fn topic_keywords(&self, id: i64) -> Option<&[(String, f64)]>;

    /// The first `k` keywords of a topic. Unknown ids give an empty list.
    fn top_keywords(&self, id: i64, k: usize) -> Vec<&str> {
        self.topic_keywords(id)
            .map(|kws| kws.iter().take(k).map(|(w, _)| w.as_str()).collect())
            .unwrap_or_default()
    }
}
