//! Embedding backends.

pub mod ollama;
pub mod openai;
pub mod trigram;

pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use trigram::TrigramProvider;
