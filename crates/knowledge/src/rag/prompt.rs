//! Prompt construction for grounded answering.

use crate::types::RetrievalResult;

/// System instruction for grounded answers.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the provided context. \
If the answer cannot be found in the context, say that you don't know.";

/// Render retrieval results as numbered context blocks, best first.
///
/// ```text
/// [Document 1] (Source: doc.txt, Page 2, Relevance: 0.87)
/// chunk text
/// ```
pub fn format_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let metadata = &result.chunk.metadata;
            let page = metadata
                .page
                .map(|p| format!(", Page {}", p))
                .unwrap_or_default();

            format!(
                "[Document {}] (Source: {}{}, Relevance: {:.2})\n{}\n",
                i + 1,
                metadata.source,
                page,
                result.score,
                result.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Human turn carrying the context and the question.
pub fn build_user_prompt(context: &str, query: &str) -> String {
    format!("Context:\n{}\n\nQuestion: {}", context, query)
}
