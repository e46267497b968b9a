// Embedding oracle: trait-based abstraction over the contextual encoder.
//
// EmbeddingOracle defines the interface. OnnxEncoder implements it with a
// local BERT-style ONNX model and a HuggingFace tokenizer.

pub mod onnx;
pub mod traits;

pub use onnx::OnnxEncoder;
pub use traits::{EmbeddingOracle, EncodedSequence};
