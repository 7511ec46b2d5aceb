use crate::chunker::Chunker;
use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::rag::{RagEngine, RagOptions, NO_CONTEXT_ANSWER};
use crate::vector_index::VectorIndex;
use docent_core::{AppError, AppResult};
use docent_llm::{ChatRole, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmUsage};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const DIMENSIONS: usize = 384;
const QUERY: &str = "What is the capital of France?";

/// Generation fake that counts calls and remembers the last request.
#[derive(Default)]
struct RecordingLlm {
    calls: AtomicUsize,
    last_request: Mutex<Option<LlmRequest>>,
    fail: bool,
}

impl RecordingLlm {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmClient for RecordingLlm {
    fn provider_name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        if self.fail {
            return Err(AppError::Llm("rate limited".to_string()));
        }

        Ok(LlmResponse {
            content: "Paris is the capital of France.".to_string(),
            model: request.model.clone(),
            usage: LlmUsage::new(40, 7),
            done: true,
        })
    }

    async fn stream(&self, _request: &LlmRequest) -> AppResult<LlmStream> {
        Err(AppError::Llm("streaming not used by the engine".to_string()))
    }
}

fn write_capitals(dir: &Path) {
    fs::write(
        dir.join("doc.txt"),
        "Paris is the capital of France. Berlin is the capital of Germany.",
    )
    .unwrap();
}

fn engine(dir: &Path, llm: Arc<RecordingLlm>) -> RagEngine {
    // Small chunks so each sentence becomes its own chunk.
    let chunker = Chunker::new(40, 0).unwrap();
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(DIMENSIONS));
    let index = VectorIndex::new(DIMENSIONS).unwrap();

    RagEngine::new(chunker, embedder, index, llm, RagOptions::new(dir)).unwrap()
}

#[tokio::test]
async fn test_capital_scenario() {
    let temp = TempDir::new().unwrap();
    write_capitals(temp.path());
    let llm = Arc::new(RecordingLlm::default());
    let engine = engine(temp.path(), llm.clone());

    assert_eq!(engine.index_directory(temp.path()).await.unwrap(), 2);

    let ranked = engine.retrieve(QUERY, 2).await.unwrap();
    assert_eq!(ranked.len(), 2);
    assert!(ranked[0].chunk.text.contains("France"));
    assert!(ranked[0].score > ranked[1].score);

    let answer = engine.answer_question(QUERY, 1).await.unwrap();
    assert!(answer.has_context);
    assert_eq!(answer.answer, "Paris is the capital of France.");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].source, "doc.txt");
    assert_eq!(answer.sources[0].score, ranked[0].score);
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_generation_sees_formatted_context_only() {
    let temp = TempDir::new().unwrap();
    write_capitals(temp.path());
    let llm = Arc::new(RecordingLlm::default());
    let engine = engine(temp.path(), llm.clone());
    engine.index_directory(temp.path()).await.unwrap();

    engine.answer_question(QUERY, 1).await.unwrap();

    let request = llm.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, ChatRole::System);
    assert!(request.messages[0].content.contains("say that you don't know"));

    let human = &request.messages[1].content;
    assert!(human.starts_with("Context:\n[Document 1] (Source: doc.txt, Relevance: "));
    assert!(human.ends_with("\n\nQuestion: What is the capital of France?"));
    assert!(!human.contains("Berlin"));
}

#[tokio::test]
async fn test_no_hits_skips_generation() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(RecordingLlm::default());
    let engine = engine(temp.path(), llm.clone());

    let answer = engine.answer_question(QUERY, 3).await.unwrap();

    assert!(!answer.has_context);
    assert_eq!(answer.answer, NO_CONTEXT_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_generation_failure_propagates() {
    let temp = TempDir::new().unwrap();
    write_capitals(temp.path());
    let llm = Arc::new(RecordingLlm::failing());
    let engine = engine(temp.path(), llm.clone());
    engine.index_directory(temp.path()).await.unwrap();

    let result = engine.answer_question(QUERY, 1).await;
    assert!(matches!(result, Err(AppError::Llm(_))));
}

#[tokio::test]
async fn test_dimension_mismatch_rejected_at_assembly() {
    let temp = TempDir::new().unwrap();
    let result = RagEngine::new(
        Chunker::new(500, 50).unwrap(),
        Arc::new(TrigramProvider::new(DIMENSIONS)),
        VectorIndex::new(1536).unwrap(),
        Arc::new(RecordingLlm::default()),
        RagOptions::new(temp.path()),
    );

    assert!(matches!(result, Err(AppError::Config(_))));
}

#[tokio::test]
async fn test_ensure_index_builds_then_loads() {
    let temp = TempDir::new().unwrap();
    write_capitals(temp.path());

    let first = engine(temp.path(), Arc::new(RecordingLlm::default()));
    assert_eq!(first.ensure_index().await.unwrap(), 2);
    assert!(temp.path().join("vector_store.index").is_file());
    assert!(temp.path().join("vector_store.docs.json").is_file());
    assert!(temp.path().join("vector_store.meta.json").is_file());

    // A fresh engine picks up the saved artifacts instead of re-reading sources.
    fs::remove_file(temp.path().join("doc.txt")).unwrap();
    let second = engine(temp.path(), Arc::new(RecordingLlm::default()));
    assert_eq!(second.ensure_index().await.unwrap(), 2);

    let before = first.retrieve(QUERY, 2).await.unwrap();
    let after = second.retrieve(QUERY, 2).await.unwrap();
    for (a, b) in before.iter().zip(&after) {
        assert_eq!(a.chunk.id, b.chunk.id);
        assert!((a.score - b.score).abs() < 1e-6);
    }
}

#[tokio::test]
async fn test_reindex_requires_data_directory() {
    let temp = TempDir::new().unwrap();
    let engine = engine(&temp.path().join("missing"), Arc::new(RecordingLlm::default()));

    assert!(matches!(
        engine.reindex().await,
        Err(AppError::Knowledge(_))
    ));
}

#[tokio::test]
async fn test_reindex_replaces_contents() {
    let temp = TempDir::new().unwrap();
    write_capitals(temp.path());
    let engine = engine(temp.path(), Arc::new(RecordingLlm::default()));
    assert_eq!(engine.reindex().await.unwrap(), 2);

    fs::write(temp.path().join("doc.txt"), "Rome is in Italy.").unwrap();
    assert_eq!(engine.reindex().await.unwrap(), 1);
    assert_eq!(engine.len().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reindex_and_save_keep_disk_in_step() {
    let temp = TempDir::new().unwrap();
    write_capitals(temp.path());
    let engine = engine(temp.path(), Arc::new(RecordingLlm::default()));
    assert_eq!(engine.reindex().await.unwrap(), 2);

    fs::write(temp.path().join("doc.txt"), "Rome is in Italy.").unwrap();
    let (first, saved, retrieved, second) = tokio::join!(
        engine.reindex(),
        engine.save_index(),
        engine.retrieve(QUERY, 2),
        engine.reindex(),
    );

    assert_eq!(first.unwrap(), 1);
    assert_eq!(second.unwrap(), 1);
    assert!(saved.unwrap().count >= 1);
    assert!(!retrieved.unwrap().is_empty());

    let persisted = VectorIndex::load(temp.path(), "vector_store").unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted.len(), engine.len().await);
    assert_eq!(persisted.chunks()[0].text, engine.retrieve(QUERY, 1).await.unwrap()[0].chunk.text);
}
