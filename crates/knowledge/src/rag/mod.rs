//! Retrieval-augmented answering.
//!
//! [`RagEngine`] ties the chunker, the embedder and the vector index to a
//! generation client: retrieve, format context, generate, cite sources.

pub mod api;
pub mod engine;
pub mod prompt;
pub mod types;

pub use api::{HealthResponse, IndexResponse, QueryRequest, QueryResponse};
pub use engine::{RagEngine, RagOptions};
pub use prompt::format_context;
pub use types::{RagAnswer, SourceRef, NO_CONTEXT_ANSWER};
