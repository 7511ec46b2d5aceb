//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};

/// Provenance of a chunk within its source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source file name (e.g., "doc.txt")
    pub source: String,

    /// 1-based page number, when the source is paged
    pub page: Option<u32>,

    /// Position of the chunk within its source (0-indexed)
    pub chunk_index: usize,
}

/// A text segment produced by the chunker.
///
/// Immutable once created. The id is derived from the source file name and
/// chunk index, so two chunks from one indexing run never share an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Unique chunk identifier (`{source}-chunk-{index}`)
    pub id: String,

    /// Text content
    pub text: String,

    /// Provenance metadata
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    /// Create a chunk, deriving its id from the source and index.
    pub fn new(source: &str, chunk_index: usize, page: Option<u32>, text: String) -> Self {
        Self {
            id: format!("{}-chunk-{}", source, chunk_index),
            text,
            metadata: ChunkMetadata {
                source: source.to_string(),
                page,
                chunk_index,
            },
        }
    }
}

/// Insertion payload for the vector index.
///
/// The vector is consumed by the index on insertion and never returned
/// alongside the chunk.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub embedding: Vec<f32>,
    pub chunk: DocumentChunk,
}

impl IndexEntry {
    pub fn new(embedding: Vec<f32>, chunk: DocumentChunk) -> Self {
        Self { embedding, chunk }
    }
}

/// A chunk returned by a nearest-neighbour search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk: DocumentChunk,

    /// Relevance in (0, 1]; identical vectors score 1
    pub score: f32,
}
