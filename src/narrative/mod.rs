// Contextual narrative bias scoring.
//
// Occurrence extraction, contextual embedding, document aggregation and the
// bias metric, plus the reference anchors the metric is measured against.

pub mod aggregate;
pub mod anchors;
pub mod batcher;
pub mod bias;
pub mod occurrence;
pub mod pipeline;

pub use aggregate::DocumentVector;
pub use anchors::{build_reference_anchors, AnchorSeeds, ReferenceAnchors};
pub use batcher::{OccurrenceEmbedding, Pooling};
pub use bias::BiasRecord;
pub use occurrence::{extract_occurrences, Occurrence, WindowStrategy};
pub use pipeline::{analyze_word, AnalysisContext, NarrativeParams, WordReport, WordStats};
