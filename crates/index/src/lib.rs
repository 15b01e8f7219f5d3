pub mod cache;
pub mod dedup;
pub mod embeddings;
pub mod error;
pub mod similarity;

#[cfg(test)]
mod testing;

pub use cache::EmbeddingCache;
pub use dedup::{DedupConfig, DuplicateRecord, SemanticDeduplicator};
pub use embeddings::{EmbeddingConfig, EmbeddingService, OllamaEmbedder};
pub use error::EmbeddingError;
