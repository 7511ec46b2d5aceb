//! Embedding generation.
//!
//! Every backend implements [`EmbeddingProvider`]; callers hold an
//! `Arc<dyn EmbeddingProvider>` and never branch on the concrete backend.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
