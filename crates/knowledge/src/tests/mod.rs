//! End-to-end tests for the RAG engine with in-memory fakes.

mod rag_engine;
