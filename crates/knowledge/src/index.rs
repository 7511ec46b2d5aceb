//! On-disk persistence for the vector index.
//!
//! A saved index is three files sharing one base name:
//! - `{name}.index`: all vectors as little-endian `f32`, row-major
//! - `{name}.docs.json`: the chunks, in insertion order
//! - `{name}.meta.json`: dimension, item count, checksum of the vectors

use crate::types::DocumentChunk;
use chrono::{DateTime, Utc};
use docent_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Locations of the three artifacts of one saved index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPaths {
    pub vectors: PathBuf,
    pub docs: PathBuf,
    pub meta: PathBuf,
}

impl IndexPaths {
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            vectors: dir.join(format!("{}.index", name)),
            docs: dir.join(format!("{}.docs.json", name)),
            meta: dir.join(format!("{}.meta.json", name)),
        }
    }

    /// Whether a saved index appears to exist (the numeric artifact is present).
    pub fn exists(&self) -> bool {
        self.vectors.is_file()
    }

    fn all(&self) -> [&Path; 3] {
        [&self.vectors, &self.docs, &self.meta]
    }
}

/// Contents of the metadata artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub dimension: usize,
    pub count: usize,
    /// SHA-256 of the numeric artifact, lowercase hex
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// Raw contents of a saved index, verified for consistency.
#[derive(Debug)]
pub(crate) struct StoredIndex {
    pub meta: IndexMeta,
    pub vectors: Vec<f32>,
    pub chunks: Vec<DocumentChunk>,
}

/// Write the three artifacts.
pub(crate) fn write_index(
    paths: &IndexPaths,
    dimension: usize,
    vectors: &[f32],
    chunks: &[DocumentChunk],
) -> AppResult<IndexMeta> {
    if let Some(parent) = paths.vectors.parent() {
        fs::create_dir_all(parent)?;
    }

    let bytes = embedding_to_bytes(vectors);
    let meta = IndexMeta {
        dimension,
        count: chunks.len(),
        checksum: checksum(&bytes),
        created_at: Utc::now(),
    };

    fs::write(&paths.vectors, &bytes)?;
    fs::write(&paths.docs, serde_json::to_vec(chunks)?)?;
    fs::write(&paths.meta, serde_json::to_vec_pretty(&meta)?)?;

    tracing::debug!(
        "Wrote index artifacts: {} items, {} bytes of vectors",
        meta.count,
        bytes.len()
    );

    Ok(meta)
}

/// Read and cross-check the three artifacts.
///
/// # Errors
/// `AppError::Integrity` when an artifact is missing or the artifacts
/// disagree with each other.
pub(crate) fn read_index(paths: &IndexPaths) -> AppResult<StoredIndex> {
    for path in paths.all() {
        if !path.is_file() {
            return Err(AppError::Integrity(format!(
                "Missing index artifact: {:?}",
                path
            )));
        }
    }

    let meta: IndexMeta = serde_json::from_slice(&fs::read(&paths.meta)?)
        .map_err(|e| AppError::Integrity(format!("Unreadable index metadata: {}", e)))?;
    let chunks: Vec<DocumentChunk> = serde_json::from_slice(&fs::read(&paths.docs)?)
        .map_err(|e| AppError::Integrity(format!("Unreadable document artifact: {}", e)))?;
    let bytes = fs::read(&paths.vectors)?;

    if checksum(&bytes) != meta.checksum {
        return Err(AppError::Integrity(
            "Vector artifact checksum does not match metadata".to_string(),
        ));
    }

    let vectors = bytes_to_embedding(&bytes)?;

    if chunks.len() != meta.count {
        return Err(AppError::Integrity(format!(
            "Document artifact holds {} chunks, metadata records {}",
            chunks.len(),
            meta.count
        )));
    }
    if vectors.len() != meta.count * meta.dimension {
        return Err(AppError::Integrity(format!(
            "Vector artifact holds {} values, expected {} x {}",
            vectors.len(),
            meta.count,
            meta.dimension
        )));
    }

    Ok(StoredIndex {
        meta,
        vectors,
        chunks,
    })
}

fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Convert vectors to little-endian bytes.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to vectors.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Integrity(
            "Invalid vector artifact length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
