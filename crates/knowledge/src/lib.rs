//! Document knowledge base for retrieval-augmented answering.
//!
//! - [`chunker`]: split documents into overlapping chunks
//! - [`embeddings`]: turn text into vectors (OpenAI, Ollama or offline trigram)
//! - [`vector_index`]: flat L2 nearest-neighbour index with persistence
//! - [`rag`]: the engine answering queries with cited sources

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod parser;
pub mod rag;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunker::Chunker;
pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::{IndexMeta, IndexPaths};
pub use rag::{RagAnswer, RagEngine, RagOptions, SourceRef};
pub use types::{ChunkMetadata, DocumentChunk, IndexEntry, RetrievalResult};
pub use vector_index::VectorIndex;
