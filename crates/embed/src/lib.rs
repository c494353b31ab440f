pub mod model;
pub mod provider;

pub use model::{encode, similarity, SimilarityMetric, EMBEDDING_DIMENSION};
pub use provider::EmbeddingProvider;
