//! RAG answer types.

use crate::types::RetrievalResult;
use serde::{Deserialize, Serialize};

/// Answer given when retrieval finds nothing to ground on.
pub const NO_CONTEXT_ANSWER: &str = "I don't have enough information to answer this question.";

/// A cited source, one per retrieved chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source file name (e.g., "doc.txt")
    pub source: String,

    /// 1-based page, when the source is paged
    #[serde(default)]
    pub page: Option<u32>,

    /// Retrieval score of the cited chunk
    pub score: f32,
}

impl From<&RetrievalResult> for SourceRef {
    fn from(result: &RetrievalResult) -> Self {
        Self {
            source: result.chunk.metadata.source.clone(),
            page: result.chunk.metadata.page,
            score: result.score,
        }
    }
}

/// Outcome of answering one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,

    /// Cited sources in retrieval score order
    pub sources: Vec<SourceRef>,

    /// Whether any context was retrieved
    pub has_context: bool,
}

impl RagAnswer {
    /// Answer for a query that retrieved nothing.
    pub fn no_context() -> Self {
        Self {
            answer: NO_CONTEXT_ANSWER.to_string(),
            sources: Vec::new(),
            has_context: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentChunk;

    #[test]
    fn test_no_context_answer() {
        let answer = RagAnswer::no_context();
        assert_eq!(answer.answer, NO_CONTEXT_ANSWER);
        assert!(answer.sources.is_empty());
        assert!(!answer.has_context);
    }

    #[test]
    fn test_source_from_result() {
        let result = RetrievalResult {
            chunk: DocumentChunk::new("manual.txt", 4, Some(2), "text".to_string()),
            score: 0.75,
        };

        let source = SourceRef::from(&result);
        assert_eq!(source.source, "manual.txt");
        assert_eq!(source.page, Some(2));
        assert_eq!(source.score, 0.75);
    }
}
