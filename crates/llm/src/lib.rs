//! LLM integration crate for Docent.
//!
//! This crate provides a provider-agnostic abstraction over chat-style
//! Large Language Models. Callers hand over a conversation and receive the
//! reply either whole or as a stream of text increments.
//!
//! # Providers
//! - **OpenAI**: `/chat/completions`, including server-sent streaming
//! - **Ollama**: Local LLM runtime via `/api/chat`
//!
//! # Example
//! ```no_run
//! use docent_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::from_prompt("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{
    ChatMessage, ChatRole, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage,
};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
