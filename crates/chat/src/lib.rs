//! Streaming answer delivery.
//!
//! - [`events`]: stream events and their server-sent encoding
//! - [`metrics`]: token, latency and cost accounting
//! - [`retrieval`]: in-process and HTTP retrieval backends
//! - [`service`]: the chat service with its augmented and plain paths

pub mod events;
pub mod metrics;
pub mod retrieval;
pub mod service;

pub use events::{EventStream, Metrics, StreamEvent};
pub use metrics::{available_models, resolve_model, AVAILABLE_MODELS};
pub use retrieval::{RagApiClient, RetrievalBackend};
pub use service::{ChatCompletion, ChatRequest, ChatService, ChatSettings};
