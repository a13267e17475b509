//! Readmate Vector crate - embedding services and the in-memory meeting index.
//!
//! Provides a blocking embedding trait with an ONNX backend and a
//! deterministic mock, plus a brute-force inner-product index that is
//! rebuilt once per batch run.

pub mod embedding;
pub mod index;

pub use embedding::{build_embedder, EmbeddingService, MockEmbedding, OnnxEmbeddingService};
pub use index::{l2_normalize, IndexMetadata, SearchHit, VectorIndex};
